//! Parser lifecycle: load, validate, extract.
//!
//! One `MatrixParser` handles exactly one file end to end and is then
//! discarded. Structural problems (wrong sheets, wrong header text,
//! mistyped cells) surface during `validate()` so a bad file is
//! rejected before any quote row is touched; data problems deep in an
//! otherwise well-formed file surface while the quote iterator is
//! drained and are the caller's to handle.

use std::cell::{Cell, RefCell};

use crate::dates::{DateStrategy, ValidityWindow};
use crate::error::RatesheetError;
use crate::quote::{Quote, RateClassResolver};
use crate::reader::{
    compile_regex, CellKind, CellValue, Coord, Document, SheetRef, SourceFormat,
};
use crate::units::EnergyUnit;
use crate::volume::{self, VolumeOptions, VolumeRange};

/// The lazy quote sequence an adapter's extraction step produces.
/// End-of-stream is the iterator's `None`, not an empty-batch sentinel.
pub type QuoteStream<'p> = Box<dyn Iterator<Item = Result<Quote, RatesheetError>> + 'p>;

/// What a declared cell must contain. Text expectations are treated as
/// regexes; anything else must compare equal.
#[derive(Debug, Clone)]
pub enum Expected {
    Pattern(String),
    Value(CellValue),
}

#[derive(Debug, Clone)]
pub struct CellExpectation {
    pub coord: Coord,
    pub expected: Expected,
}

impl CellExpectation {
    pub fn text(
        sheet: impl Into<SheetRef>,
        row: i64,
        col: impl Into<crate::addressing::ColumnRef>,
        pattern: impl Into<String>,
    ) -> Self {
        CellExpectation {
            coord: Coord::new(sheet, row, col),
            expected: Expected::Pattern(pattern.into()),
        }
    }

    pub fn value(
        sheet: impl Into<SheetRef>,
        row: i64,
        col: impl Into<crate::addressing::ColumnRef>,
        value: CellValue,
    ) -> Self {
        CellExpectation {
            coord: Coord::new(sheet, row, col),
            expected: Expected::Value(value),
        }
    }
}

/// Whether the loaded document's sheet titles must match the declared
/// list exactly or merely contain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    Exact,
    Superset,
}

/// Immutable declarative configuration for one supplier adapter.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub format: SourceFormat,
    pub expected_sheets: Vec<String>,
    pub sheet_match: TitleMatch,
    pub expectations: Vec<CellExpectation>,
    pub source_unit: EnergyUnit,
    pub target_unit: EnergyUnit,
    pub date_strategy: Option<DateStrategy>,
}

impl AdapterConfig {
    pub fn new(format: SourceFormat, source_unit: EnergyUnit, target_unit: EnergyUnit) -> Self {
        AdapterConfig {
            format,
            expected_sheets: Vec::new(),
            sheet_match: TitleMatch::Superset,
            expectations: Vec::new(),
            source_unit,
            target_unit,
            date_strategy: None,
        }
    }
}

/// Result of an adapter's file pre-processing hook: either (possibly
/// rewritten) bytes in a loadable format, or an already-normalized
/// document (the PDF-derived path).
pub enum Prepared {
    Bytes(Vec<u8>, SourceFormat),
    Document(Document),
}

/// Everything an adapter's extraction step can see. Copyable so
/// adapters can move it into row closures freely.
#[derive(Clone, Copy)]
pub struct ParseContext<'p> {
    pub doc: &'p Document,
    pub file_name: Option<&'p str>,
    pub window: Option<ValidityWindow>,
    pub resolver: &'p dyn RateClassResolver,
    pub source_unit: EnergyUnit,
    pub target_unit: EnergyUnit,
}

impl<'p> ParseContext<'p> {
    /// The file-level validity window. Adapters that price per row may
    /// override; everyone else calls this.
    pub fn window(&self) -> Result<ValidityWindow, RatesheetError> {
        self.window.ok_or_else(|| {
            RatesheetError::validation("no validity-date strategy configured for this adapter")
        })
    }

    pub fn volume_options(&self) -> VolumeOptions {
        VolumeOptions::new(self.source_unit, self.target_unit)
    }

    pub fn extract_volume(
        &self,
        coord: &Coord,
        pattern: &regex::Regex,
        opts: &VolumeOptions,
    ) -> Result<VolumeRange, RatesheetError> {
        volume::extract_range(self.doc, coord, pattern, opts)
    }
}

/// One supplier layout. Concrete implementations configure the
/// declarative pieces and supply the single abstract step: walking that
/// supplier's grid and yielding quotes.
pub trait SupplierAdapter {
    fn config(&self) -> &AdapterConfig;

    /// Optional file transformation before the reader sees the bytes
    /// (dialect conversion, PDF normalization). Default is passthrough.
    fn preprocess(
        &self,
        bytes: Vec<u8>,
        _file_name: Option<&str>,
    ) -> Result<Prepared, RatesheetError> {
        Ok(Prepared::Bytes(bytes, self.config().format))
    }

    /// Adapter-specific checks run after the declarative ones.
    fn validate_extra(&self, _ctx: &ParseContext<'_>) -> Result<(), RatesheetError> {
        Ok(())
    }

    /// The one required step: iterate the supplier's layout and yield
    /// quotes lazily.
    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError>;
}

/// Build a lazy quote stream from a per-row extraction function over
/// Excel data rows `0..height`. A row error is yielded in place and the
/// stream continues; callers decide whether to abandon the file.
pub fn stream_rows<'p, F>(height: usize, mut per_row: F) -> QuoteStream<'p>
where
    F: FnMut(i64) -> Result<Vec<Quote>, RatesheetError> + 'p,
{
    Box::new((0..height as i64).flat_map(move |row| match per_row(row) {
        Ok(quotes) => quotes.into_iter().map(Ok).collect::<Vec<_>>(),
        Err(e) => vec![Err(e)],
    }))
}

/// Owns one file's journey through load -> validate -> extract.
pub struct MatrixParser {
    adapter: Box<dyn SupplierAdapter>,
    resolver: Box<dyn RateClassResolver>,
    doc: Option<Document>,
    file_name: Option<String>,
    validated: Cell<bool>,
    extracted: Cell<bool>,
    window: RefCell<Option<ValidityWindow>>,
    count: Cell<usize>,
}

impl MatrixParser {
    pub fn new(adapter: Box<dyn SupplierAdapter>, resolver: Box<dyn RateClassResolver>) -> Self {
        MatrixParser {
            adapter,
            resolver,
            doc: None,
            file_name: None,
            validated: Cell::new(false),
            extracted: Cell::new(false),
            window: RefCell::new(None),
            count: Cell::new(0),
        }
    }

    /// Load a raw file, running the adapter's preprocessing hook first.
    /// Resets validation state; the file name is kept for adapters that
    /// derive dates from it.
    pub fn load(&mut self, bytes: &[u8], file_name: Option<&str>) -> Result<(), RatesheetError> {
        let prepared = self.adapter.preprocess(bytes.to_vec(), file_name)?;
        let doc = match prepared {
            Prepared::Bytes(bytes, format) => Document::load(&bytes, format)?,
            Prepared::Document(doc) => doc,
        };
        self.install(doc, file_name);
        Ok(())
    }

    /// Install an already-built document (in-memory callers and tests).
    pub fn load_document(&mut self, doc: Document, file_name: Option<&str>) {
        self.install(doc, file_name);
    }

    fn install(&mut self, doc: Document, file_name: Option<&str>) {
        self.doc = Some(doc);
        self.file_name = file_name.map(str::to_string);
        self.validated.set(false);
        self.extracted.set(false);
        *self.window.borrow_mut() = None;
        self.count.set(0);
    }

    fn doc(&self) -> Result<&Document, RatesheetError> {
        self.doc
            .as_ref()
            .ok_or_else(|| RatesheetError::validation("parser has no loaded document"))
    }

    fn context(&self) -> Result<ParseContext<'_>, RatesheetError> {
        let config = self.adapter.config();
        Ok(ParseContext {
            doc: self.doc()?,
            file_name: self.file_name.as_deref(),
            window: *self.window.borrow(),
            resolver: self.resolver.as_ref(),
            source_unit: config.source_unit,
            target_unit: config.target_unit,
        })
    }

    /// Check declared sheet titles and cell expectations, then the
    /// adapter's extra-validation hook. Idempotent: a second call on a
    /// validated parser is a no-op.
    pub fn validate(&self) -> Result<(), RatesheetError> {
        if self.validated.get() {
            return Ok(());
        }
        let doc = self.doc()?;
        let config = self.adapter.config();

        let titles = doc.sheet_titles();
        for expected in &config.expected_sheets {
            if !titles.iter().any(|t| t == expected) {
                return Err(RatesheetError::validation(format!(
                    "expected sheet '{expected}' not found; document has {titles:?}"
                )));
            }
        }
        if config.sheet_match == TitleMatch::Exact && titles.len() != config.expected_sheets.len()
        {
            return Err(RatesheetError::validation(format!(
                "sheet titles {titles:?} do not exactly match expected {:?}",
                config.expected_sheets
            )));
        }

        for expectation in &config.expectations {
            self.check_expectation(doc, expectation)?;
        }

        self.adapter.validate_extra(&self.context()?)?;
        self.validated.set(true);
        Ok(())
    }

    fn check_expectation(
        &self,
        doc: &Document,
        expectation: &CellExpectation,
    ) -> Result<(), RatesheetError> {
        let coord = &expectation.coord;
        match &expectation.expected {
            Expected::Pattern(pattern) => {
                let value =
                    doc.get(coord.sheet.clone(), coord.row, coord.col, &[CellKind::Text])?;
                let text = value.as_text().unwrap_or_default();
                let regex = compile_regex(pattern)?;
                if !regex.is_match(text) {
                    return Err(RatesheetError::validation(format!(
                        "cell at {coord}: '{text}' does not match expected /{pattern}/"
                    )));
                }
            }
            Expected::Value(expected) => {
                let value =
                    doc.get(coord.sheet.clone(), coord.row, coord.col, &[expected.kind()])?;
                if &value != expected {
                    return Err(RatesheetError::validation(format!(
                        "cell at {coord}: expected '{expected}', found '{value}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Produce the lazy quote stream. Validates first if the caller
    /// never did; derives the validity window exactly once per file.
    /// Non-restartable: extracting twice requires a fresh parser and a
    /// fresh load.
    pub fn extract_quotes(&self) -> Result<QuoteIter<'_>, RatesheetError> {
        self.validate()?;
        if self.extracted.replace(true) {
            return Err(RatesheetError::validation(
                "quotes already extracted from this parser; load a fresh one",
            ));
        }
        if self.window.borrow().is_none() {
            if let Some(strategy) = &self.adapter.config().date_strategy {
                let window = strategy.get_dates(self.doc()?, self.file_name.as_deref())?;
                *self.window.borrow_mut() = Some(window);
            }
        }
        let inner = self.adapter.extract(self.context()?)?;
        Ok(QuoteIter {
            inner,
            count: &self.count,
        })
    }

    /// Running count of quotes yielded so far, for progress reporting.
    pub fn get_count(&self) -> usize {
        self.count.get()
    }

    pub fn is_validated(&self) -> bool {
        self.validated.get()
    }
}

/// Iterator over extracted quotes that keeps the parser's running
/// count current as items are pulled.
pub struct QuoteIter<'p> {
    inner: QuoteStream<'p>,
    count: &'p Cell<usize>,
}

impl Iterator for QuoteIter<'_> {
    type Item = Result<Quote, RatesheetError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next();
        if let Some(Ok(_)) = &item {
            self.count.set(self.count.get() + 1);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::InMemoryResolver;
    use crate::reader::Sheet;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct FixedAdapter {
        config: AdapterConfig,
        quotes: Vec<Quote>,
    }

    impl SupplierAdapter for FixedAdapter {
        fn config(&self) -> &AdapterConfig {
            &self.config
        }

        fn extract<'p>(
            &'p self,
            _ctx: ParseContext<'p>,
        ) -> Result<QuoteStream<'p>, RatesheetError> {
            Ok(Box::new(self.quotes.clone().into_iter().map(Ok)))
        }
    }

    fn sample_quote() -> Quote {
        let day = NaiveDate::from_ymd_opt(2015, 6, 1).unwrap();
        Quote {
            start_from: day,
            start_until: NaiveDate::from_ymd_opt(2015, 7, 1).unwrap(),
            term_months: 12,
            valid_from: day,
            valid_until: day,
            volume_min: dec!(0),
            volume_limit: Some(dec!(100)),
            rate_class_alias: "CT-CLP".into(),
            rate_class_ids: vec![None],
            purchase_of_receivables: false,
            price: dec!(0.0715),
            source_ref: None,
        }
    }

    fn parser_with(config: AdapterConfig, quotes: Vec<Quote>) -> MatrixParser {
        MatrixParser::new(
            Box::new(FixedAdapter { config, quotes }),
            Box::new(InMemoryResolver::default()),
        )
    }

    fn one_sheet_doc(title: &str) -> Document {
        Document::from_sheets(vec![Sheet::new(
            title,
            vec![vec![CellValue::Text("Utility".into())]],
        )])
    }

    fn kwh_config() -> AdapterConfig {
        AdapterConfig::new(SourceFormat::Xlsx, EnergyUnit::Kwh, EnergyUnit::Kwh)
    }

    #[test]
    fn validate_requires_loaded_document() {
        let parser = parser_with(kwh_config(), vec![]);
        assert!(parser.validate().is_err());
    }

    #[test]
    fn missing_expected_sheet_fails_before_extraction() {
        let mut config = kwh_config();
        config.expected_sheets = vec!["Daily Matrix Price".into()];
        let mut parser = parser_with(config, vec![sample_quote()]);
        parser.load_document(one_sheet_doc("Other Sheet"), None);
        let err = parser.validate().unwrap_err();
        assert!(err.to_string().contains("Daily Matrix Price"));
        assert_eq!(parser.get_count(), 0);
    }

    #[test]
    fn exact_title_match_rejects_extras() {
        let mut config = kwh_config();
        config.expected_sheets = vec!["A".into()];
        config.sheet_match = TitleMatch::Exact;
        let mut parser = parser_with(config, vec![]);
        parser.load_document(
            Document::from_sheets(vec![
                Sheet::new("A", vec![vec![]]),
                Sheet::new("B", vec![vec![]]),
            ]),
            None,
        );
        assert!(parser.validate().is_err());
    }

    #[test]
    fn text_expectation_is_a_regex() {
        let mut config = kwh_config();
        config.expectations = vec![CellExpectation::text(0, -1, 'A', r"^Util")];
        let mut parser = parser_with(config, vec![]);
        parser.load_document(one_sheet_doc("S"), None);
        assert!(parser.validate().is_ok());

        let mut config = kwh_config();
        config.expectations = vec![CellExpectation::text(0, -1, 'A', r"^Price$")];
        let mut parser = parser_with(config, vec![]);
        parser.load_document(one_sheet_doc("S"), None);
        assert!(parser.validate().is_err());
    }

    #[test]
    fn value_expectation_is_exact() {
        let mut config = kwh_config();
        config.expectations = vec![CellExpectation::value(0, -1, 'A', CellValue::Int(7))];
        let mut parser = parser_with(config, vec![]);
        parser.load_document(
            Document::from_sheets(vec![Sheet::new("S", vec![vec![CellValue::Int(7)]])]),
            None,
        );
        assert!(parser.validate().is_ok());
    }

    #[test]
    fn validate_is_idempotent() {
        let mut parser = parser_with(kwh_config(), vec![]);
        parser.load_document(one_sheet_doc("S"), None);
        assert!(parser.validate().is_ok());
        assert!(parser.validate().is_ok());
        assert!(parser.is_validated());
    }

    #[test]
    fn extract_auto_validates() {
        let mut config = kwh_config();
        config.expected_sheets = vec!["Nope".into()];
        let mut parser = parser_with(config, vec![sample_quote()]);
        parser.load_document(one_sheet_doc("S"), None);
        // validate() never called explicitly; extract must run it
        assert!(parser.extract_quotes().is_err());
    }

    #[test]
    fn count_tracks_pulled_quotes() {
        let mut parser = parser_with(kwh_config(), vec![sample_quote(), sample_quote()]);
        parser.load_document(one_sheet_doc("S"), None);
        let mut iter = parser.extract_quotes().unwrap();
        assert_eq!(parser.get_count(), 0);
        iter.next().unwrap().unwrap();
        assert_eq!(parser.get_count(), 1);
        iter.next().unwrap().unwrap();
        assert!(iter.next().is_none());
        assert_eq!(parser.get_count(), 2);
    }

    #[test]
    fn extraction_is_not_restartable() {
        let mut parser = parser_with(kwh_config(), vec![sample_quote()]);
        parser.load_document(one_sheet_doc("S"), None);
        let _ = parser.extract_quotes().unwrap();
        assert!(parser.extract_quotes().is_err());
    }

    #[test]
    fn reload_resets_state() {
        let mut parser = parser_with(kwh_config(), vec![sample_quote()]);
        parser.load_document(one_sheet_doc("S"), None);
        parser.extract_quotes().unwrap().count();
        parser.load_document(one_sheet_doc("S"), None);
        assert!(!parser.is_validated());
        assert_eq!(parser.get_count(), 0);
        assert_eq!(parser.extract_quotes().unwrap().count(), 1);
    }

    #[test]
    fn stream_rows_yields_row_errors_in_place() {
        let stream = stream_rows(3, |row| {
            if row == 1 {
                Err(RatesheetError::validation("bad row"))
            } else {
                Ok(vec![sample_quote()])
            }
        });
        let items: Vec<_> = stream.collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
        assert!(items[2].is_ok());
    }
}
