//! Integration tests for tablestream

use proptest::prelude::*;
use std::io::{Cursor, Read};
use tablestream::aggregate::aggregate;
use tablestream::{
    Alignment, AnyExport, CellValue, Column, ColumnDef, ColumnPlan, DelimitedExport, ExportEngine,
    ExportError, ExportOptions, MemoryTable, Sheet, SourceError, SumNumericColumns, TableSource,
    ValueType, WorkbookExport,
};
use tempfile::NamedTempFile;

fn payroll() -> MemoryTable {
    MemoryTable::builder()
        .column(ColumnDef::new("name", ValueType::Text).header("Name"))
        .column(ColumnDef::new("ssn", ValueType::Text).header("SSN").collapsed())
        .column(
            ColumnDef::new("amount", ValueType::Float)
                .header("Amount")
                .align(Alignment::End),
        )
        .generated(
            ColumnDef::new("taxes", ValueType::Float).header("Taxes"),
            |record| match record.get("amount") {
                CellValue::Float(amount) => CellValue::Float(amount * 0.0825),
                _ => CellValue::Empty,
            },
        )
        .row(vec!["Jane".into(), "111-22-3333".into(), 1000.0.into()])
        .row(vec!["John".into(), "444-55-6666".into(), 750.0.into()])
        .build()
}

fn zip_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut out = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
    out
}

fn csv_rows(bytes: &[u8]) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes)
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn delimited(options: ExportOptions, table: &MemoryTable) -> Vec<Vec<String>> {
    let mut export = DelimitedExport::new(options);
    export.add_source(table).unwrap();
    csv_rows(&export.export().unwrap().output)
}

#[test]
fn test_workbook_shape() {
    let options = ExportOptions::default()
        .with_report_title("Demo Report")
        .with_display_totals(true);
    let mut export = WorkbookExport::new(options);
    let summary = export.add_source(&payroll()).unwrap();
    assert_eq!(summary.columns, 4);
    assert_eq!(summary.data_rows, 2);
    assert_eq!(summary.rows_written, 5);

    let artifact = export.export().unwrap();
    assert_eq!(
        artifact.mime_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let sheet = zip_part(&artifact.output, "xl/worksheets/sheet1.xml");
    assert_eq!(sheet.matches("<row ").count(), 5);
    // every row carries every column, empty title cells included
    assert_eq!(sheet.matches("<c r=").count(), 5 * 4);
    assert!(sheet.contains("<mergeCell ref=\"A1:D1\"/>"));
    assert!(sheet.contains("<c r=\"D5\""));
}

#[test]
fn test_collapsed_columns() {
    let table = payroll();

    let kept = delimited(ExportOptions::default(), &table);
    assert_eq!(kept[0], ["Name", "SSN", "Amount", "Taxes"]);

    let excluded = delimited(
        ExportOptions::default().with_exclude_collapsed_columns(true),
        &table,
    );
    assert_eq!(excluded[0], ["Name", "Amount", "Taxes"]);
    assert_eq!(excluded[1], ["Jane", "1000.00", "82.50"]);

    // Dropping a column must not shift the others' data
    assert_eq!(kept.len(), excluded.len());
    for (full, narrow) in kept.iter().zip(&excluded) {
        assert_eq!(full.len(), 4);
        assert_eq!(narrow.len(), 3);
        for (k, e) in [(0, 0), (2, 1), (3, 2)] {
            assert_eq!(full[k], narrow[e]);
        }
        assert!(!narrow.iter().any(|cell| cell.contains("-22-") || cell.contains("-55-")));
    }
    assert_eq!(kept[2][1], "444-55-6666");

    let reincluded = delimited(
        ExportOptions::default()
            .with_exclude_collapsed_columns(true)
            .reinclude_column("ssn"),
        &table,
    );
    assert_eq!(reincluded[0], ["Name", "SSN", "Amount", "Taxes"]);
}

#[test]
fn test_collapse_state_read_at_export_time() {
    let mut table = payroll();
    let options = ExportOptions::default().with_exclude_collapsed_columns(true);

    table.set_collapsed("ssn", false);
    table.set_collapsed("amount", true);
    let rows = delimited(options, &table);
    assert_eq!(rows[0], ["Name", "SSN", "Taxes"]);
}

#[test]
fn test_totals_row() {
    let options = ExportOptions::default()
        .with_row_headers(true)
        .with_display_totals(true)
        .with_total_label("Grand total")
        .with_column_format("taxes", "#0.0000");
    let rows = delimited(options, &payroll());
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3], ["Grand total", "", "1750.00", "144.3750"]);
}

#[test]
fn test_csv_round_trip_and_quoting() {
    let table = MemoryTable::builder()
        .column(ColumnDef::new("note", ValueType::Text).header("Note, quoted"))
        .column(ColumnDef::new("count", ValueType::Integer))
        .row(vec!["plain".into(), CellValue::Int(1)])
        .row(vec!["comma, inside".into(), CellValue::Int(2)])
        .row(vec!["say \"hi\"".into(), CellValue::Int(3)])
        .row(vec!["two\r\nlines".into(), CellValue::Int(4)])
        .build();

    let rows = delimited(ExportOptions::default(), &table);
    assert_eq!(
        rows,
        vec![
            vec!["Note, quoted", "count"],
            vec!["plain", "1"],
            vec!["comma, inside", "2"],
            vec!["say \"hi\"", "3"],
            vec!["two\r\nlines", "4"],
        ]
    );
}

#[test]
fn test_column_order_and_formats() {
    let options = ExportOptions::default()
        .with_column_order(["amount", "name"])
        .with_numeric_format("#,##0.0");
    let rows = delimited(options, &payroll());
    // generated columns missing from the order are appended
    assert_eq!(rows[0], ["Amount", "Name", "Taxes"]);
    assert_eq!(rows[1], ["1,000.0", "Jane", "82.5"]);
}

#[test]
fn test_generated_column_overrides_stored() {
    let table = MemoryTable::builder()
        .column(ColumnDef::new("name", ValueType::Text))
        .column(ColumnDef::new("score", ValueType::Text))
        .generated(ColumnDef::new("score", ValueType::Integer), |record| {
            CellValue::Int(record.index() as i64 * 10)
        })
        .row(vec!["a".into(), "stored".into()])
        .row(vec!["b".into(), "stored".into()])
        .build();

    let plan = ColumnPlan::build(&table, &ExportOptions::default());
    let score = plan.get("score").unwrap();
    assert!(score.is_generated);
    assert_eq!(score.value_type, ValueType::Integer);

    let rows = delimited(ExportOptions::default(), &table);
    assert_eq!(rows, vec![vec!["name", "score"], vec!["a", "0"], vec!["b", "10"]]);
}

#[test]
fn test_sheets_keep_insertion_order() {
    let table = payroll();
    let mut export = WorkbookExport::new(ExportOptions::default());
    export.add_sheet(Sheet::new(&table).named("S1")).unwrap();
    export
        .add_sheet(Sheet::new(&table).named("S2").with_title("Second"))
        .unwrap();
    let artifact = export.export().unwrap();

    let workbook = zip_part(&artifact.output, "xl/workbook.xml");
    let s1 = workbook.find("name=\"S1\"").unwrap();
    let s2 = workbook.find("name=\"S2\"").unwrap();
    assert!(s1 < s2);

    let first = zip_part(&artifact.output, "xl/worksheets/sheet1.xml");
    let second = zip_part(&artifact.output, "xl/worksheets/sheet2.xml");
    assert!(!first.contains("Second"));
    assert!(second.contains("Second"));
}

#[test]
fn test_engine_selection() {
    let csv = AnyExport::from_options(ExportOptions::default().with_delimited_mode(true)).unwrap();
    assert!(matches!(csv, AnyExport::Delimited(_)));
    assert_eq!(csv.file_name(), "Table-Export.csv");

    let xlsx = AnyExport::from_options(ExportOptions::default()).unwrap();
    assert!(matches!(xlsx, AnyExport::Workbook(_)));

    let conflict = ExportOptions::default()
        .with_delimited_mode(true)
        .with_export_file_name("report.xlsx");
    assert!(matches!(
        AnyExport::from_options(conflict),
        Err(ExportError::Configuration(_))
    ));
}

#[test]
fn test_delimited_rejects_second_sheet() {
    let table = payroll();
    let mut export = AnyExport::from_options(ExportOptions::default().with_delimited_mode(true)).unwrap();
    export.add_source(&table).unwrap();
    let err = export.add_sheet(Sheet::new(&table).named("S2")).unwrap_err();
    assert!(matches!(err, ExportError::Configuration(_)));
}

/// Source whose lookups fail for one item
struct Flaky {
    bad_item: u32,
}

impl TableSource for Flaky {
    type ItemId = u32;

    fn item_ids(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        Box::new(0..5)
    }

    fn visible_columns(&self) -> Vec<String> {
        vec!["id".to_string(), "value".to_string()]
    }

    fn property_type(&self, _column_id: &str) -> Option<ValueType> {
        Some(ValueType::Integer)
    }

    fn property_value(&self, item: &u32, column_id: &str) -> Result<CellValue, SourceError> {
        if *item == self.bad_item && column_id == "value" {
            return Err(SourceError::new("backing store unavailable"));
        }
        Ok(CellValue::Int(i64::from(*item)))
    }
}

#[test]
fn test_source_failure_yields_no_artifact() {
    let mut export = WorkbookExport::new(ExportOptions::default().with_sheet_name("Data"));
    let err = export.add_source(&Flaky { bad_item: 3 }).unwrap_err();
    match &err {
        ExportError::SourceAccess {
            sheet,
            column,
            item,
            source,
        } => {
            assert_eq!(sheet, "Data");
            assert_eq!(column, "value");
            assert_eq!(item, "3");
            assert_eq!(source.message(), "backing store unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(export.export().is_err());
}

#[test]
fn test_export_to_file() {
    let temp = NamedTempFile::new().unwrap();
    let mut export = WorkbookExport::create(temp.path(), ExportOptions::default()).unwrap();
    export.add_source(&payroll()).unwrap();
    export.export().unwrap();

    let bytes = std::fs::read(temp.path()).unwrap();
    let sheet = zip_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("Jane"));
}

#[test]
fn test_large_export_streams() {
    let mut builder = MemoryTable::builder()
        .column(ColumnDef::new("id", ValueType::Integer))
        .column(ColumnDef::new("label", ValueType::Text));
    for i in 0..5_000 {
        builder = builder.row(vec![CellValue::Int(i), format!("row {i}").into()]);
    }
    let table = builder.build();

    let options = ExportOptions::default()
        .with_display_totals(true)
        .with_streaming_profile(tablestream::StreamingProfile::Low);
    let mut export = WorkbookExport::new(options);
    export.add_source(&table).unwrap();
    let artifact = export.export().unwrap();

    let sheet = zip_part(&artifact.output, "xl/worksheets/sheet1.xml");
    assert_eq!(sheet.matches("<row ").count(), 5_002);
    // 0 + 1 + ... + 4999
    assert!(sheet.contains("<v>12497500</v>"));
}

fn int_column() -> Column {
    Column {
        id: "n".into(),
        header: "n".into(),
        alignment: Alignment::End,
        value_type: ValueType::Integer,
        format: None,
        is_generated: false,
        is_row_header: false,
        vertical: false,
    }
}

proptest! {
    #[test]
    fn prop_totals_ignore_row_order(values in prop::collection::vec(-1_000_000i64..1_000_000, 0..50)) {
        let column = int_column();
        let forward = aggregate(&SumNumericColumns, &column, values.iter().copied().map(CellValue::Int), "Total");
        let backward = aggregate(&SumNumericColumns, &column, values.iter().rev().copied().map(CellValue::Int), "Total");
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward, Some(CellValue::Int(values.iter().sum())));
    }

    #[test]
    fn prop_csv_cells_survive_quoting(texts in prop::collection::vec("[ -~\t\r\n]{0,16}", 1..8)) {
        let mut builder = MemoryTable::builder()
            .column(ColumnDef::new("text", ValueType::Text))
            .column(ColumnDef::new("marker", ValueType::Text));
        for text in &texts {
            builder = builder.row(vec![text.as_str().into(), "x".into()]);
        }
        let rows = delimited(ExportOptions::default(), &builder.build());

        prop_assert_eq!(rows.len(), texts.len() + 1);
        for (row, text) in rows[1..].iter().zip(&texts) {
            prop_assert_eq!(&row[0], text);
            prop_assert_eq!(&row[1], "x");
        }
    }
}
