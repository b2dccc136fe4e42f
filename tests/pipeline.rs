use relgraph::config::RenderConfig;
use relgraph::dictionary::{self, NameDictionary};
use relgraph::engine::{InferenceEngine, LinkSource};
use relgraph::html::{self, RenderError};
use relgraph::metadata::{self, MetadataProvider};
use relgraph::presentation::GroupFilter;
use relgraph::rules::Group;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_database(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE BIOG_MAIN (c_personid INTEGER, c_name TEXT, c_dy INTEGER);
         CREATE TABLE DYNASTIES (c_dy INTEGER, c_dynasty_chn TEXT);
         CREATE TABLE KIN_DATA (c_personid INTEGER, c_kin_code INTEGER);
         CREATE TABLE KINSHIP_CODES (c_kincode INTEGER, c_kinrel TEXT);
         CREATE TABLE KIN_CODES (c_kin_code INTEGER, c_kinrel_chn TEXT);
         CREATE TABLE ADDR_CODES (c_addr_id INTEGER, c_name TEXT);
         CREATE TABLE BIOG_ADDR_DATA (c_personid INTEGER, c_addr_id INTEGER);
         CREATE TABLE NOTES (remark TEXT, c_source INTEGER, c_bibl_ref INTEGER);
         CREATE TABLE SOURCES (c_bibl_ref INTEGER);",
    )
    .unwrap();
}

#[test]
fn test_sqlite_to_html() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("schema.db");
    create_database(&db);

    let tables_csv = dir.path().join("tables.csv");
    fs::write(
        &tables_csv,
        "table_code,explanation_cn,explanation_en\nBIOG_MAIN,人物,Biographies\nDYNASTIES,nan,Dynasties\n",
    )
    .unwrap();

    let source = metadata::load_or_empty(&db);
    assert_eq!(source.list_tables().len(), 9);

    let dict = dictionary::load_or_empty(Some(&tables_csv), None);
    let graph = InferenceEngine::new().infer(&source, &dict);

    assert_eq!(graph.node("BIOG_MAIN").unwrap().group, Group::Core);
    assert_eq!(graph.node("BIOG_MAIN").unwrap().meaning.as_deref(), Some("人物"));
    assert_eq!(graph.node("DYNASTIES").unwrap().meaning.as_deref(), Some("Dynasties"));
    assert_eq!(graph.node("KIN_DATA").unwrap().group, Group::Kinship);

    let strong = graph
        .edges
        .iter()
        .find(|e| e.touches("DYNASTIES") && e.touches("BIOG_MAIN"))
        .unwrap();
    assert_eq!(strong.link_key, "c_dy");
    assert_eq!(strong.source, LinkSource::Strong);
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.touches("KIN_DATA") && e.touches("KIN_CODES") && e.link_key == "c_kin_code")
    );
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.touches("BIOG_ADDR_DATA") && e.touches("ADDR_CODES"))
    );
    // c_source is ignored, so NOTES reaches SOURCES only through c_bibl_ref.
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.touches("NOTES") && e.link_key == "c_bibl_ref" && e.source == LinkSource::Orphan)
    );
    assert!(graph.edges.iter().all(|e| e.table_a != e.table_b));

    let page = html::render_page(&graph, &GroupFilter::all(), &RenderConfig::default()).unwrap();
    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains(r#"class="node" data-id="BIOG_MAIN""#));
    assert!(page.contains(r#"data-key="c_dy""#));
    assert!(page.contains(r#"<option value="c_personid">"#));

    let out = dir.path().join("graph.html");
    fs::write(&out, &page).unwrap();
    assert!(fs::metadata(&out).unwrap().len() > 0);
}

#[test]
fn test_group_filter_on_real_database() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("schema.db");
    create_database(&db);

    let graph = InferenceEngine::new().infer(&metadata::load_or_empty(&db), &NameDictionary::new());
    let page = html::render_page(
        &graph,
        &GroupFilter::only([Group::Kinship, Group::Dict]),
        &RenderConfig::default(),
    )
    .unwrap();
    assert!(page.contains(r#"class="node" data-id="KIN_DATA""#));
    assert!(!page.contains(r#"class="node" data-id="BIOG_MAIN""#));

    let err = html::render_page(
        &graph,
        &GroupFilter::only([Group::Text]),
        &RenderConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::EmptySelection { .. }));
}

#[test]
fn test_missing_database_renders_empty_page() {
    let dir = TempDir::new().unwrap();
    let source = metadata::load_or_empty(&dir.path().join("absent.db"));
    assert!(source.list_tables().is_empty());

    let graph = InferenceEngine::new().infer(&source, &NameDictionary::new());
    assert!(graph.is_empty());
    let page = html::render_page(&graph, &GroupFilter::all(), &RenderConfig::default()).unwrap();
    assert!(page.contains("No tables found"));
}
