//! Aligned text listing of exported constants.
//!
//! Output per file:
//!
//! ```text
//! // package util, file const.go
//!
//! // Block doc.
//! Foo = 1 // doc
//! Bar = 2
//!
//! ```
//!
//! Names are left-justified to the block width. A blank line follows every
//! block, including blocks with nothing exported.

use std::io::{self, Write};

use crate::extract::{ExportedBlock, ExportedFile};

fn write_comment_line(out: &mut dyn Write, line: &str) -> io::Result<()> {
    if line.is_empty() {
        writeln!(out, "//")
    } else {
        writeln!(out, "// {}", line)
    }
}

/// Writes one file section.
pub fn render_file(out: &mut dyn Write, file: &ExportedFile) -> io::Result<()> {
    writeln!(out, "// package {}, file {}", file.package, file.file_name)?;
    writeln!(out)?;
    for block in &file.blocks {
        render_block(out, block)?;
    }
    Ok(())
}

/// Writes one const block followed by its blank separator line.
pub fn render_block(out: &mut dyn Write, block: &ExportedBlock) -> io::Result<()> {
    for line in &block.doc {
        write_comment_line(out, line)?;
    }
    for constant in &block.constants {
        for line in &constant.doc {
            write_comment_line(out, line)?;
        }
        write!(out, "{:<width$} = {}", constant.name, constant.value, width = block.width)?;
        match constant.comment.split_first() {
            Some((first, rest)) => {
                if first.is_empty() {
                    writeln!(out, " //")?;
                } else {
                    writeln!(out, " // {}", first)?;
                }
                for line in rest {
                    write_comment_line(out, line)?;
                }
            }
            None => writeln!(out)?,
        }
    }
    writeln!(out)
}

/// Renders a file section into a string.
pub fn render_to_string(file: &ExportedFile) -> String {
    let mut buf = Vec::new();
    // writing into a Vec cannot fail
    let _ = render_file(&mut buf, file);
    String::from_utf8_lossy(&buf).into_owned()
}
