// End-to-end reconstruction of a small digest volume read from disk

use chrono::NaiveDate;
use newsdigest::{
    infer_year, read_transcript, AbstractId, HeadingVariant, Issue, ReconstructionConfig, Reconstructor,
    Transcript, Volume,
};

#[path = "integration/mod.rs"]
mod test_utils;
use test_utils::{assert_golden_file, clean_sample, outline, TestFixture, SAMPLE_TRANSCRIPT};

fn id(raw: &str) -> AbstractId {
    raw.parse().unwrap()
}

async fn reconstruct_sample() -> Volume {
    let fixture = TestFixture::new();
    let path = fixture.create_sample_volume();
    let year = infer_year(&path).unwrap();
    let transcript = read_transcript(&path).await.unwrap();

    let config = ReconstructionConfig {
        year,
        source_label: path.display().to_string(),
        ..ReconstructionConfig::default()
    };
    Reconstructor::new(config).unwrap().reconstruct_transcript(&transcript)
}

#[tokio::test]
async fn test_heading_tree_outline() {
    let volume = reconstruct_sample().await;

    let expected = "\
advertising-and-advertisers [6..20) 1,2
  book-stores [11..20) 3
    religious-books [14..20) 3-1/2
children [20..25) 5,5+1
streets [25..) 6
";
    assert_golden_file(&outline(&volume), expected, "sample outline");
}

#[tokio::test]
async fn test_abstract_fields() {
    let volume = reconstruct_sample().await;
    assert_eq!(volume.year, 1864);

    let first = volume.abstracts.get(&id("1")).unwrap();
    assert_eq!(first.line_num, 7);
    assert_eq!(first.newspaper, "L");
    assert_eq!(first.date, NaiveDate::from_ymd_opt(1864, 3, 5).unwrap());
    assert_eq!(first.display_date, "5 March 1864");
    assert_eq!(first.inches, 3);
    assert_eq!(first.body_lines.len(), 3);
    assert_eq!(first.source_page, Some(1));

    let editorial = volume.abstracts.get(&id("3")).unwrap();
    assert_eq!(editorial.kind, "ed");
    assert_eq!(editorial.normalized_metadata, "L May 28; ed:1/1,2");

    // the record runs across the page break at line 16
    let half = volume.abstracts.get(&id("3-1/2")).unwrap();
    assert_eq!(half.line_num, 15);
    assert_eq!(half.inches, 6);
    assert_eq!(half.placements().collect::<Vec<_>>(), vec![(3, 1), (3, 2), (3, 3), (4, 5)]);
    assert_eq!(half.source_page, Some(1));
    assert!(half.body_lines.iter().any(|line| line.contains("Camp Cleveland")));
    assert!(!half.body_lines.iter().any(|line| line.contains("DIGEST")));

    // OCR'd month token
    let fuzzy = volume.abstracts.get(&id("6")).unwrap();
    assert_eq!(fuzzy.date, NaiveDate::from_ymd_opt(1864, 5, 17).unwrap());
    assert_eq!(fuzzy.source_page, Some(2));
}

#[tokio::test]
async fn test_page_breaks_recovered() {
    let volume = reconstruct_sample().await;
    let breaks: Vec<_> = volume
        .page_breaks
        .iter()
        .map(|b| (b.line, b.source_page))
        .collect();
    assert_eq!(breaks, vec![(3, 1), (16, 2)]);

    let children = volume.headings.find_root("children").unwrap();
    assert_eq!(children.source_page, Some(2));
}

#[tokio::test]
async fn test_cross_references_resolved() {
    let volume = reconstruct_sample().await;
    assert_eq!(volume.unresolved().count(), 0);

    let variants: Vec<_> = volume.cross_references.iter().map(|e| (e.start_line, e.variant)).collect();
    assert_eq!(
        variants,
        vec![
            (19, HeadingVariant::See),
            (22, HeadingVariant::SeeAbstract),
            (23, HeadingVariant::SeeAlso),
        ]
    );

    let see = &volume.cross_references[0];
    let target = see.targets[0].structural().unwrap();
    assert_eq!(target.resolved_path.as_deref(), Some("children"));

    let placeholder = volume.cross_references[1].placeholder.as_ref().unwrap();
    assert_eq!(placeholder.matches, vec![id("5")]);
    assert_eq!(placeholder.synthetic_id, Some(id("5+1")));

    let synthetic = volume.abstracts.get(&id("5+1")).unwrap();
    assert!(synthetic.synthetic);
    assert_eq!(synthetic.line_num, 22);
    assert_eq!(synthetic.references, vec![id("5")]);

    // See also hangs off the heading whose direct interval holds it
    let children = volume.headings.find_root("children").unwrap();
    assert_eq!(volume.cross_references[2].attached_to, Some(children.id));
    assert_eq!(children.see_also.len(), 1);
    let see_also = children.see_also[0].structural().unwrap();
    assert_eq!(
        see_also.resolved_path.as_deref(),
        Some("advertising-and-advertisers/book-stores")
    );
}

#[tokio::test]
async fn test_issue_index() {
    let volume = reconstruct_sample().await;
    let june_3 = NaiveDate::from_ymd_opt(1864, 6, 3).unwrap();
    assert_eq!(volume.issues.column(june_3, 4, 5), &[id("3-1/2")]);
    assert!(volume.issues.column(june_3, 4, 4).is_empty());

    // synthetic records never reach the index
    let feb_28 = NaiveDate::from_ymd_opt(1864, 2, 28).unwrap();
    assert_eq!(volume.issues.column(feb_28, 3, 3), &[id("5")]);
    assert_eq!(volume.issues.issue_count(), 6);
}

#[tokio::test]
async fn test_run_stats() {
    let volume = reconstruct_sample().await;
    let stats = &volume.stats;

    assert!(stats.source.ends_with("1864-corrected.txt"));
    assert_eq!(stats.year, 1864);
    assert_eq!(stats.lines_read, 27);
    assert_eq!(stats.abstracts_parsed, 6);
    assert_eq!(stats.abstracts_malformed, 0);
    assert_eq!(stats.synthetic_abstracts, 1);
    assert_eq!(stats.headings, 3);
    assert_eq!(stats.subheadings1, 1);
    assert_eq!(stats.subheadings2, 1);
    assert_eq!(stats.cross_references, 3);
    assert_eq!(stats.headings_unclassified, 1);
    assert_eq!(stats.page_breaks, 2);
    assert_eq!(stats.max_page, 4);
    assert_eq!(stats.max_column, 5);
    assert_eq!(stats.max_inches, 6);
    assert_eq!(stats.highest_id, Some(id("6")));
    assert_eq!(stats.id_breaks, 1);
    assert_eq!(stats.missing_ids, vec![4]);
    assert!(stats.disordered_ids.is_empty());
    assert_eq!(stats.diagnostics, 1);
    assert_eq!(stats.status, "issues");
}

#[tokio::test]
async fn test_unclassified_line_is_the_only_diagnostic() {
    let volume = reconstruct_sample().await;
    assert!(!volume.is_clean());

    let diagnostics: Vec<_> = volume.diagnostics().collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].line, 27);
    assert_eq!(diagnostics[0].text, "McKinley, William 1843");
    assert_eq!(diagnostics[0].issue, Issue::UnclassifiedHeading);
}

#[test]
fn test_clean_sample_is_clean() {
    let transcript = Transcript::from_lines(clean_sample().lines());
    let volume = Reconstructor::new(ReconstructionConfig::default())
        .unwrap()
        .reconstruct_transcript(&transcript);
    assert!(volume.is_clean(), "{:?}", volume.diagnostics);
    assert_eq!(volume.stats.status, "clean");
}

#[test]
fn test_parallel_and_repeated_runs_agree() {
    let transcript = Transcript::from_lines(SAMPLE_TRANSCRIPT.lines());
    let reconstructor = Reconstructor::new(ReconstructionConfig::default()).unwrap();
    let first = reconstructor.reconstruct_transcript(&transcript);
    let second = reconstructor.reconstruct_transcript(&transcript);

    assert_eq!(outline(&first), outline(&second));
    let ids = |v: &Volume| v.abstracts.ids().collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
}

#[tokio::test]
async fn test_volume_serializes() {
    let volume = reconstruct_sample().await;
    let json = serde_json::to_value(&volume).unwrap();

    assert_eq!(json["year"], 1864);
    let abstracts = json["abstracts"].as_array().unwrap();
    assert_eq!(abstracts.len(), 7);
    assert_eq!(abstracts[0]["id"], "1");
    assert_eq!(json["stats"]["status"], "issues");
    assert_eq!(json["diagnostics"][0]["issue"]["kind"], "unclassified_heading");
}
