use crate::thread::Entry;
use std::io::Write;

/// Write a thread as Markdown:
///
/// ```text
/// # {title}
///
/// Created: {created}
///
/// **USER**:
/// {content}
///
/// ```
pub fn write_markdown<W: Write>(
    writer: &mut W,
    entries: &[Entry],
    title: &str,
    created: &str,
) -> std::io::Result<()> {
    writeln!(writer, "# {}", title)?;
    writeln!(writer)?;
    writeln!(writer, "Created: {}", created)?;
    writeln!(writer)?;

    for entry in entries {
        writeln!(writer, "**{}**:", entry.role.to_uppercase())?;
        writeln!(writer, "{}", entry.content)?;
        writeln!(writer)?;
    }

    Ok(())
}
