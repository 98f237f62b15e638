//! Roster extraction from HTML team pages.
//!
//! Each roster row is either a staff row (one name, one title) or a board row
//! holding several board cells, each of which gets the fixed board title.

use crate::domain::model::RosterEntry;
use crate::utils::error::{EtlError, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterSelectors {
    pub row: String,
    pub staff_marker: String,
    pub staff_name: String,
    pub staff_title: String,
    pub board_member: String,
    pub board_name: String,
    pub board_title: String,
}

impl Default for RosterSelectors {
    fn default() -> Self {
        Self {
            row: "div.bioRow".to_string(),
            staff_marker: "div.staff".to_string(),
            staff_name: "h1.staffName".to_string(),
            staff_title: "h3.staffTitle".to_string(),
            board_member: "div.board".to_string(),
            board_name: "h3.boardName".to_string(),
            board_title: "Advisor".to_string(),
        }
    }
}

/// Parsed form of `RosterSelectors`, built once per run.
pub struct CompiledSelectors {
    row: Selector,
    staff_marker: Selector,
    staff_name: Selector,
    staff_title: Selector,
    board_member: Selector,
    board_name: Selector,
    board_title: String,
}

fn compile(field: &str, css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| EtlError::InvalidConfigValueError {
        field: format!("extract.selectors.{}", field),
        value: css.to_string(),
        reason: format!("Invalid CSS selector: {}", e),
    })
}

impl RosterSelectors {
    pub fn compile(&self) -> Result<CompiledSelectors> {
        Ok(CompiledSelectors {
            row: compile("row", &self.row)?,
            staff_marker: compile("staff_marker", &self.staff_marker)?,
            staff_name: compile("staff_name", &self.staff_name)?,
            staff_title: compile("staff_title", &self.staff_title)?,
            board_member: compile("board_member", &self.board_member)?,
            board_name: compile("board_name", &self.board_name)?,
            board_title: self.board_title.clone(),
        })
    }
}

#[derive(Debug, Default)]
pub struct RosterExtraction {
    pub entries: Vec<RosterEntry>,
    /// Rows that could not be read; always `MalformedSnapshotRow`.
    pub skipped: Vec<EtlError>,
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>())
}

/// Extracts (name, title) entries from one snapshot page, in document order.
pub fn extract_roster(
    html: &str,
    selectors: &CompiledSelectors,
    source_label: &str,
) -> RosterExtraction {
    let document = Html::parse_document(html);
    let mut extraction = RosterExtraction::default();

    let malformed = |row: usize, reason: &str| EtlError::MalformedSnapshotRow {
        source_label: source_label.to_string(),
        row,
        reason: reason.to_string(),
    };

    for (index, row) in document.select(&selectors.row).enumerate() {
        let row_number = index + 1;

        if row.select(&selectors.staff_marker).next().is_some() {
            let name = first_text(row, &selectors.staff_name);
            let title = first_text(row, &selectors.staff_title);
            match (name, title) {
                (Some(name), Some(title)) => {
                    push_entry(&mut extraction, RosterEntry::new(&name, &title), || {
                        malformed(row_number, "staff name or title is blank")
                    });
                }
                (None, _) => extraction
                    .skipped
                    .push(malformed(row_number, "staff row has no name")),
                (_, None) => extraction
                    .skipped
                    .push(malformed(row_number, "staff row has no title")),
            }
            continue;
        }

        let mut board_cells = row.select(&selectors.board_member).peekable();
        if board_cells.peek().is_some() {
            for cell in board_cells {
                match first_text(cell, &selectors.board_name) {
                    Some(name) => {
                        let entry = RosterEntry::new(&name, &selectors.board_title);
                        push_entry(&mut extraction, entry, || {
                            malformed(row_number, "board member name is blank")
                        });
                    }
                    None => extraction
                        .skipped
                        .push(malformed(row_number, "board cell has no name")),
                }
            }
            continue;
        }

        extraction
            .skipped
            .push(malformed(row_number, "cannot find name in row"));
    }

    for err in &extraction.skipped {
        tracing::warn!("⚠️ Skipping row: {}", err);
    }

    extraction
}

fn push_entry(
    extraction: &mut RosterExtraction,
    entry: RosterEntry,
    on_blank: impl FnOnce() -> EtlError,
) {
    if entry.person.is_empty() || entry.title.is_empty() {
        extraction.skipped.push(on_blank());
    } else {
        extraction.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <div class="bioRow">
    <div class="staff">
      <h1 class="staffName">  Jane
         Doe </h1>
      <h3 class="staffTitle">Executive   Director</h3>
    </div>
  </div>
  <div class="bioRow">
    <div class="board"><h3 class="boardName">Ann Lee</h3></div>
    <div class="board"><h3 class="boardName">Raj Patel</h3></div>
  </div>
  <div class="bioRow">
    <p>Spacer row</p>
  </div>
  <div class="bioRow">
    <div class="staff"><h1 class="staffName">No Title</h1></div>
  </div>
</body></html>
"#;

    #[test]
    fn test_extract_staff_and_board_rows() {
        let selectors = RosterSelectors::default().compile().unwrap();
        let extraction = extract_roster(PAGE, &selectors, "2020-01.html");

        assert_eq!(
            extraction.entries,
            vec![
                RosterEntry::new("Jane Doe", "Executive Director"),
                RosterEntry::new("Ann Lee", "Advisor"),
                RosterEntry::new("Raj Patel", "Advisor"),
            ]
        );
        assert_eq!(extraction.skipped.len(), 2);
        assert!(extraction.skipped.iter().all(|e| e.is_recoverable()));
        assert!(extraction.skipped[0]
            .to_string()
            .contains("cannot find name in row"));
        assert!(extraction.skipped[1].to_string().contains("row 4"));
    }

    #[test]
    fn test_custom_board_title() {
        let selectors = RosterSelectors {
            board_title: "Board Member".to_string(),
            ..RosterSelectors::default()
        }
        .compile()
        .unwrap();
        let extraction = extract_roster(PAGE, &selectors, "page");
        assert!(extraction
            .entries
            .iter()
            .any(|e| e.person == "Ann Lee" && e.title == "Board Member"));
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let selectors = RosterSelectors {
            row: "div[".to_string(),
            ..RosterSelectors::default()
        };
        assert!(matches!(
            selectors.compile(),
            Err(EtlError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_page_without_rows() {
        let selectors = RosterSelectors::default().compile().unwrap();
        let extraction = extract_roster("<html><body></body></html>", &selectors, "empty");
        assert!(extraction.entries.is_empty());
        assert!(extraction.skipped.is_empty());
    }
}
