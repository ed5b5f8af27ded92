//! CSV question import.
//!
//! Header: `question,answer1,answer2,answer3,answer4,correctanswer,points`
//! with an optional trailing `timelimit`. Headers are matched
//! case-insensitively after trimming. Quoted fields may hold commas,
//! newlines and `""` escapes.

use std::collections::HashMap;

use quiz_core::model::{AnswerDraft, PackageId, QuestionDraft, QuestionId};
use tracing::{debug, info, warn};

use crate::error::{ImportError, ImportRowError};
use crate::question_service::QuestionService;

pub const REQUIRED_HEADERS: [&str; 7] = [
    "question",
    "answer1",
    "answer2",
    "answer3",
    "answer4",
    "correctanswer",
    "points",
];
pub const TIME_LIMIT_HEADER: &str = "timelimit";

const ANSWER_HEADERS: [&str; 4] = ["answer1", "answer2", "answer3", "answer4"];

/// One parsed record and the line it starts on (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    pub line: usize,
    pub fields: Vec<String>,
}

#[derive(Debug)]
pub struct RowFailure {
    pub line: usize,
    pub error: ImportRowError,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<QuestionId>,
    pub failures: Vec<RowFailure>,
}

/// Split CSV text into records. Blank lines are skipped.
///
/// # Errors
///
/// Returns `ImportError::UnterminatedQuote` when the input ends inside a
/// quoted field.
pub fn parse_records(input: &str) -> Result<Vec<CsvRecord>, ImportError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut quote_line = 1;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut fields), record_line);
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ImportError::UnterminatedQuote { line: quote_line });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_record(&mut records, fields, record_line);
    }
    Ok(records)
}

fn push_record(records: &mut Vec<CsvRecord>, fields: Vec<String>, line: usize) {
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        records.push(CsvRecord { line, fields });
    }
}

/// Column positions resolved from the header record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    columns: HashMap<String, usize>,
    /// Fields a row needs to reach the last required column.
    required_width: usize,
}

impl HeaderMap {
    /// # Errors
    ///
    /// Returns `ImportError::MissingHeaders` naming every required header that
    /// is absent.
    pub fn from_record(record: &CsvRecord) -> Result<Self, ImportError> {
        let mut columns = HashMap::new();
        for (index, name) in record.fields.iter().enumerate() {
            columns
                .entry(name.trim().to_lowercase())
                .or_insert(index);
        }
        let missing: Vec<String> = REQUIRED_HEADERS
            .iter()
            .filter(|h| !columns.contains_key(**h))
            .map(|h| (*h).to_owned())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingHeaders(missing));
        }
        let required_width = REQUIRED_HEADERS
            .iter()
            .filter_map(|h| columns.get(*h))
            .max()
            .map_or(0, |index| index + 1);
        Ok(Self {
            columns,
            required_width,
        })
    }

    fn get<'r>(&self, record: &'r CsvRecord, header: &str) -> Option<&'r str> {
        let index = *self.columns.get(header)?;
        record.fields.get(index).map(|v| v.trim())
    }

    fn value<'r>(&self, record: &'r CsvRecord, header: &str) -> &'r str {
        self.get(record, header).unwrap_or_default()
    }
}

/// Turn one data record into a draft for `package_id`.
///
/// # Errors
///
/// Returns `ImportRowError` when the record is short or a number is malformed.
pub fn row_to_draft(
    headers: &HeaderMap,
    record: &CsvRecord,
    package_id: PackageId,
) -> Result<QuestionDraft, ImportRowError> {
    if record.fields.len() < headers.required_width {
        return Err(ImportRowError::FieldCount {
            expected: headers.required_width,
            found: record.fields.len(),
        });
    }
    let correct = headers.value(record, "correctanswer");
    let correct_index = match correct.parse::<usize>() {
        Ok(n @ 1..=4) => n - 1,
        _ => return Err(ImportRowError::InvalidCorrectAnswer(correct.to_owned())),
    };

    let answers = ANSWER_HEADERS
        .iter()
        .enumerate()
        .map(|(i, header)| AnswerDraft::new(headers.value(record, header), i == correct_index))
        .collect();

    Ok(QuestionDraft {
        package_id,
        content: headers.value(record, "question").to_owned(),
        time_limit_secs: optional_number(TIME_LIMIT_HEADER, headers.get(record, TIME_LIMIT_HEADER))?,
        points: optional_number("points", Some(headers.value(record, "points")))?,
        answers,
    })
}

fn optional_number(field: &'static str, value: Option<&str>) -> Result<Option<u32>, ImportRowError> {
    match value {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| ImportRowError::InvalidNumber {
            field,
            value: v.to_owned(),
        }),
    }
}

/// Imports CSV rows as questions of one package.
#[derive(Clone)]
pub struct CsvImportService {
    questions: QuestionService,
}

impl CsvImportService {
    #[must_use]
    pub fn new(questions: QuestionService) -> Self {
        Self { questions }
    }

    /// Import every row of `input` into `package_id`.
    ///
    /// Row-level problems are collected in the report; the remaining rows are
    /// still imported.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` when the input is empty, unparseable, or lacks a
    /// required header.
    pub async fn import(
        &self,
        package_id: PackageId,
        input: &str,
    ) -> Result<ImportReport, ImportError> {
        let records = parse_records(input)?;
        let Some((header, rows)) = records.split_first() else {
            return Err(ImportError::Empty);
        };
        let headers = HeaderMap::from_record(header)?;

        let mut report = ImportReport::default();
        for record in rows {
            let created = match row_to_draft(&headers, record, package_id) {
                Ok(draft) => self
                    .questions
                    .create_question(draft)
                    .await
                    .map_err(ImportRowError::from),
                Err(e) => Err(e),
            };
            match created {
                Ok(created) => {
                    debug!(line = record.line, question_id = %created.question.id(), "row imported");
                    report.imported.push(created.question.id());
                }
                Err(error) => {
                    warn!(line = record.line, error = %error, "row skipped");
                    report.failures.push(RowFailure {
                        line: record.line,
                        error,
                    });
                }
            }
        }

        info!(
            package_id = %package_id,
            imported = report.imported.len(),
            failed = report.failures.len(),
            "csv import finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuestionServiceError;
    use quiz_core::model::{GuardianId, Package, PresentationOrder};
    use quiz_core::time::{fixed_clock, fixed_now};
    use std::sync::Arc;
    use storage::repository::{InMemoryRepository, NewPackageRecord, PackageRepository};

    const HEADER: &str = "question,answer1,answer2,answer3,answer4,correctanswer,points";

    fn fields(record: &CsvRecord) -> Vec<&str> {
        record.fields.iter().map(String::as_str).collect()
    }

    async fn importer() -> (CsvImportService, QuestionService, PackageId) {
        let repo = InMemoryRepository::new();
        let package = Package::new(
            PackageId::new(1),
            GuardianId::new(1),
            "Imported",
            None,
            PresentationOrder::Sequential,
            fixed_now(),
        )
        .unwrap();
        let package_id = repo
            .insert_new_package(NewPackageRecord::from_package(&package))
            .await
            .unwrap();
        let questions = QuestionService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        (CsvImportService::new(questions.clone()), questions, package_id)
    }

    #[test]
    fn quoted_fields_keep_commas_quotes_and_newlines() {
        let input = "a,\"b, c\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",x,y\n";
        let records = parse_records(input).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(fields(&records[0]), vec!["a", "b, c", "say \"hi\""]);
        assert_eq!(records[1].line, 2);
        assert_eq!(fields(&records[1]), vec!["multi\nline", "x", "y"]);
    }

    #[test]
    fn blank_lines_are_skipped_and_lines_counted() {
        let records = parse_records("h1,h2\n\n1,2\n   \n3,4").unwrap();
        let lines: Vec<usize> = records.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 3, 5]);
    }

    #[test]
    fn unterminated_quote_reports_its_line() {
        assert_eq!(
            parse_records("h\nok\n\"never closed\nmore"),
            Err(ImportError::UnterminatedQuote { line: 3 })
        );
    }

    #[test]
    fn headers_match_case_insensitively() {
        let record = &parse_records(" Question ,ANSWER1,Answer2,answer3,answer4,CorrectAnswer,Points,TimeLimit")
            .unwrap()[0];
        assert!(HeaderMap::from_record(record).is_ok());
    }

    #[test]
    fn missing_headers_are_listed() {
        let record = &parse_records("question,answer1,answer2,correctanswer").unwrap()[0];
        assert_eq!(
            HeaderMap::from_record(record),
            Err(ImportError::MissingHeaders(vec![
                "answer3".into(),
                "answer4".into(),
                "points".into()
            ]))
        );
    }

    #[test]
    fn empty_answer_values_stay_as_options() {
        let records = parse_records(&format!("{HEADER}\nWho meows?,Cat,Dog,,,1,")).unwrap();
        let headers = HeaderMap::from_record(&records[0]).unwrap();

        let draft = row_to_draft(&headers, &records[1], PackageId::new(1)).unwrap();

        let contents: Vec<&str> = draft.answers.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(contents, vec!["Cat", "Dog", "", ""]);
        assert!(draft.answers[0].is_correct);
        assert_eq!(draft.points, None);
        assert_eq!(draft.time_limit_secs, None);
    }

    #[test]
    fn trailing_time_limit_may_be_left_off() {
        let records = parse_records(&format!("{HEADER},timelimit\nQ,a,b,c,d,2,10\nQ,a,b,c,d,2")).unwrap();
        let headers = HeaderMap::from_record(&records[0]).unwrap();

        let draft = row_to_draft(&headers, &records[1], PackageId::new(1)).unwrap();
        assert_eq!(draft.points, Some(10));
        assert_eq!(draft.time_limit_secs, None);

        let err = row_to_draft(&headers, &records[2], PackageId::new(1)).unwrap_err();
        assert!(matches!(err, ImportRowError::FieldCount { expected: 7, found: 6 }));
    }

    #[test]
    fn correct_answer_outside_range_is_a_row_error() {
        let records = parse_records(&format!("{HEADER}\nQ,a,b,c,d,5,10")).unwrap();
        let headers = HeaderMap::from_record(&records[0]).unwrap();
        let err = row_to_draft(&headers, &records[1], PackageId::new(1)).unwrap_err();
        assert!(matches!(err, ImportRowError::InvalidCorrectAnswer(ref v) if v == "5"));
    }

    #[tokio::test]
    async fn import_reports_failures_per_row() {
        let (importer, questions, package_id) = importer().await;
        let input = format!(
            "{HEADER},timelimit\n\
             \"Cats say \"\"meow\"\", right?\",yes,no,,,1,20,15\n\
             Broken,a,b,c,d,x,10,\n\
             Too many points,a,b,c,d,2,500,\n\
             Short row,a\n\
             Blue sky?,Red,Blue,Green,,2,,\n"
        );

        let report = importer.import(package_id, &input).await.unwrap();

        assert_eq!(report.imported.len(), 2);
        let failed: Vec<usize> = report.failures.iter().map(|f| f.line).collect();
        assert_eq!(failed, vec![3, 4, 5]);
        assert!(matches!(
            report.failures[1].error,
            ImportRowError::Question(QuestionServiceError::Question(_))
        ));

        let stored = questions.list_for_package(package_id).await.unwrap();
        assert_eq!(stored[0].question.content(), "Cats say \"meow\", right?");
        assert_eq!(stored[0].question.points(), 20);
        assert_eq!(stored[0].question.time_limit_secs(), 15);
        assert_eq!(stored[0].options.len(), 4);
        assert_eq!(stored[1].question.points(), 10);
    }

    #[tokio::test]
    async fn import_aborts_on_header_problems() {
        let (importer, _, package_id) = importer().await;
        assert_eq!(
            importer.import(package_id, "").await.unwrap_err(),
            ImportError::Empty
        );
        assert!(matches!(
            importer.import(package_id, "question,points\nQ,1").await,
            Err(ImportError::MissingHeaders(_))
        ));
    }
}
