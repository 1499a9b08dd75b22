use std::io::{self, Write};

use crate::models::{DirectoryEntry, DirectoryNode};

/// Writes `node` as an ASCII tree, one entry per line with its size and
/// last write time. Directories that were descended into are expanded
/// below their entry.
pub fn write_tree<W: Write>(writer: &mut W, node: &DirectoryNode) -> io::Result<()> {
    writeln!(writer, "{}", node.path)?;
    write_entries(writer, node, &[])
}

fn write_entries<W: Write>(
    writer: &mut W,
    node: &DirectoryNode,
    ancestor_has_more: &[bool],
) -> io::Result<()> {
    for (index, entry) in node.entries.iter().enumerate() {
        let is_last = index + 1 == node.entries.len();

        for &has_more in ancestor_has_more {
            if has_more {
                writer.write_all(b"|   ")?;
            } else {
                writer.write_all(b"    ")?;
            }
        }

        if is_last {
            writer.write_all(b"`-- ")?;
        } else {
            writer.write_all(b"|-- ")?;
        }

        write_entry(writer, entry)?;

        if let Some(child) = entry
            .is_directory()
            .then(|| node.child(entry.name()))
            .flatten()
        {
            let mut next_ancestor_has_more = ancestor_has_more.to_vec();
            next_ancestor_has_more.push(!is_last);
            write_entries(writer, child, &next_ancestor_has_more)?;
        }
    }

    Ok(())
}

fn write_entry<W: Write>(writer: &mut W, entry: &DirectoryEntry) -> io::Result<()> {
    match entry.size() {
        Some(size) => writeln!(
            writer,
            "{}  [{} B, {}]",
            entry.name(),
            size,
            entry.last_modified()
        ),
        None => writeln!(writer, "{}/  [{}]", entry.name(), entry.last_modified()),
    }
}
