use crate::thread::Entry;
use docx_rs::{BreakType, Docx, Paragraph, Run, Style, StyleType};
use eyre::{Context, Result};
use std::io::{Seek, Write};

const TITLE_STYLE: &str = "Heading1";
const ROLE_STYLE: &str = "Heading3";

/// Write a thread as a Word (`.docx`) package.
///
/// Layout: the title as a level-1 heading, a `Created:` line, a blank
/// paragraph, then per entry a level-3 `ROLE:` heading, the content and a
/// blank paragraph.
pub fn write_docx<W: Write + Seek>(
    writer: &mut W,
    entries: &[Entry],
    title: &str,
    created: &str,
) -> Result<()> {
    let mut doc = Docx::new()
        .add_style(
            Style::new(TITLE_STYLE, StyleType::Paragraph)
                .name("Heading 1")
                .size(32)
                .bold(),
        )
        .add_style(
            Style::new(ROLE_STYLE, StyleType::Paragraph)
                .name("Heading 3")
                .size(24)
                .bold(),
        )
        .add_paragraph(text_paragraph(title).style(TITLE_STYLE))
        .add_paragraph(text_paragraph(&format!("Created: {}", created)))
        .add_paragraph(Paragraph::new());

    for entry in entries {
        doc = doc
            .add_paragraph(
                text_paragraph(&format!("{}:", entry.role.to_uppercase())).style(ROLE_STYLE),
            )
            .add_paragraph(text_paragraph(&entry.content))
            .add_paragraph(Paragraph::new());
    }

    doc.build()
        .pack(writer)
        .wrap_err("Failed to write docx package")
}

/// One paragraph; embedded newlines become line breaks inside a single run.
fn text_paragraph(text: &str) -> Paragraph {
    let mut run = Run::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(xml_safe(line));
    }
    Paragraph::new().add_run(run)
}

/// Drop control characters XML 1.0 cannot represent (docx-rs writes them raw,
/// leaving a package Word refuses to open). Tab, newline and carriage return stay.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| c >= ' ' || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}
