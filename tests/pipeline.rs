mod common;

use std::fs;

use common::TestWorkspace;
use csv_pgload::{
    executor::ScriptExecutor,
    import,
    ingest::IngestOptions,
    io_utils,
    schema::ColumnType,
    stream::{self, StreamItem},
};

fn options(workspace: &TestWorkspace) -> IngestOptions {
    IngestOptions {
        skips_dir: Some(workspace.skips_dir()),
        ..IngestOptions::default()
    }
}

fn script_for(workspace: &TestWorkspace, name: &str, contents: &str) -> (String, import::ImportSummary) {
    let path = workspace.write(name, contents);
    let mut executor = ScriptExecutor::new(Vec::new());
    let summary =
        import::import_file(&path, &options(workspace), &mut executor).expect("import file");
    let script = String::from_utf8(executor.into_inner()).expect("utf-8 script");
    (script, summary)
}

#[test]
fn import_renders_typed_ddl_and_reordered_dates() {
    let workspace = TestWorkspace::new();
    let (script, summary) = script_for(
        &workspace,
        "Orders 2024.csv",
        "Order ID,Customer,Total,Ordered On,Notes\n\
         1,Ada,10.5,13/01/2024,first\n\
         2,O'Brien,7,02/03/2024,\n\
         3,Bob,oops,04/05/2024,x,extra\n",
    );

    let lines = script.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 4, "{script}");
    assert_eq!(lines[0], "DROP TABLE IF EXISTS \"orders_2024\";");
    assert_eq!(
        lines[1],
        "CREATE TABLE IF NOT EXISTS \"orders_2024\" (\"orders_2024_uid\" serial PRIMARY KEY, \
         \"my_created_at\" TIMESTAMPTZ NOT NULL DEFAULT now(), \"order_id\" integer, \
         \"customer\" text, \"total\" double precision, \"ordered_on\" timestamp, \"notes\" text);"
    );
    assert_eq!(
        lines[2],
        "INSERT INTO \"orders_2024\" (\"order_id\", \"customer\", \"total\", \"ordered_on\", \"notes\") \
         VALUES (1, 'Ada', 10.5, '01/13/2024'::timestamp, 'first');"
    );
    assert_eq!(
        lines[3],
        "INSERT INTO \"orders_2024\" (\"order_id\", \"customer\", \"total\", \"ordered_on\") \
         VALUES (2, 'O''Brien', 7.0, '03/02/2024'::timestamp);"
    );

    assert_eq!(summary.table, "orders_2024");
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.degraded_rows, 0);
}

#[test]
fn malformed_rows_land_in_the_skip_log() {
    let workspace = TestWorkspace::new();
    let (_, summary) = script_for(
        &workspace,
        "people.csv",
        "id,name\n1,Ada\n2\n3,Bob,extra\n4,Cy\n",
    );
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.skipped, 2);

    let logs = workspace.skip_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(summary.skip_log.as_deref(), Some(logs[0].as_path()));
    let name = logs[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("_people_skipped.csv"), "{name}");
    let contents = fs::read_to_string(&logs[0]).expect("read skip log");
    assert_eq!(
        contents,
        "\"id\",\"name\"\n\"2\"\n\"3\",\"Bob\",\"extra\"\n"
    );
}

#[test]
fn unclosed_quote_is_skipped_not_loaded() {
    let workspace = TestWorkspace::new();
    let (script, summary) = script_for(
        &workspace,
        "notes.csv",
        "id,name\n1,Ada\n2,\"Bob\n3,Cy\n4,Di\n",
    );
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped, 1);
    assert!(!script.contains("Bob"), "{script}");

    let logs = workspace.skip_logs();
    let contents = fs::read_to_string(&logs[0]).expect("read skip log");
    assert!(contents.starts_with("\"id\",\"name\"\n\"2\",\"Bob"), "{contents}");
}

#[test]
fn accented_text_beside_slashes_loads_without_flipping_dates() {
    let workspace = TestWorkspace::new();
    let (script, summary) = script_for(
        &workspace,
        "visits.csv",
        "who,room,on\nZoë/Ana,é13/5,1/5/2024\nRenée,Büro 31/1,3/4/2024\n",
    );
    assert_eq!(summary.inserted, 2);
    assert!(
        script.contains("VALUES ('Zoë/Ana', 'é13/5'::timestamp, '1/5/2024'::timestamp);"),
        "{script}"
    );
    assert!(
        script.contains("VALUES ('Renée', 'Büro 31/1'::timestamp, '3/4/2024'::timestamp);"),
        "{script}"
    );
}

#[test]
fn month_first_dates_are_left_alone() {
    let workspace = TestWorkspace::new();
    let (script, _) = script_for(&workspace, "events.csv", "day\n12/31/2023\n1/2/2024\n");
    assert!(script.contains("'12/31/2023'::timestamp"), "{script}");
    assert!(script.contains("'1/2/2024'::timestamp"), "{script}");
}

#[test]
fn text_wins_over_numbers_seen_earlier() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("mixed.csv", "code,phone\n1,5551234\n2,555123456\nA3,1\n");
    let loaded = import::prepare(&path, &options(&workspace)).expect("prepare");
    assert_eq!(
        loaded.table.column_types(),
        vec![ColumnType::Text, ColumnType::Text]
    );
}

#[test]
fn blank_rows_insert_defaults() {
    let workspace = TestWorkspace::new();
    let (script, summary) = script_for(&workspace, "sparse.csv", "a,b\n,\n1,\n");
    let lines = script.lines().collect::<Vec<_>>();
    assert_eq!(lines[2], "INSERT INTO \"sparse\" DEFAULT VALUES;");
    assert_eq!(lines[3], "INSERT INTO \"sparse\" (\"a\") VALUES (1);");
    assert_eq!(summary.inserted, 2);
}

#[test]
fn legacy_encodings_are_decoded() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_bytes("cafe.csv", b"name\ncaf\xe9\n");
    let options = IngestOptions {
        encoding: io_utils::resolve_encoding(Some("windows-1252")).expect("encoding"),
        ..options(&workspace)
    };
    let mut executor = ScriptExecutor::new(Vec::new());
    let summary = import::import_file(&path, &options, &mut executor).expect("import");
    let script = String::from_utf8(executor.into_inner()).expect("utf-8 script");
    assert!(script.contains("VALUES ('café');"), "{script}");
    assert_eq!(summary.degraded_rows, 0);
}

#[test]
fn directories_import_in_name_order() {
    let workspace = TestWorkspace::new();
    workspace.write("batch/b.csv", "x\n1\n");
    workspace.write("batch/a.csv", "x\n2\n3\n");
    workspace.write("batch/notes.md", "ignored");

    let files = io_utils::discover_inputs(&[workspace.path().join("batch")]).expect("discover");
    let mut executor = ScriptExecutor::new(Vec::new());
    let summaries = import::import_all(&files, &options(&workspace), &mut executor).expect("import");
    let tables = summaries
        .iter()
        .map(|s| (s.table.as_str(), s.inserted))
        .collect::<Vec<_>>();
    assert_eq!(tables, vec![("a", 2), ("b", 1)]);
}

#[test]
fn generator_hands_over_statements_in_load_order() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("seq.csv", "n\n3\n1\n2\n");
    let loaded = import::prepare(&path, &options(&workspace)).expect("prepare");
    let items = stream::collect(loaded.table).expect("collect");
    let rows = items
        .iter()
        .filter_map(|item| match item {
            StreamItem::Insert { statement, .. } => Some(statement.render()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        rows,
        vec![
            "INSERT INTO \"seq\" (\"n\") VALUES (3);",
            "INSERT INTO \"seq\" (\"n\") VALUES (1);",
            "INSERT INTO \"seq\" (\"n\") VALUES (2);",
        ]
    );
    assert_eq!(items.last(), Some(&StreamItem::EndOfStream));
}
