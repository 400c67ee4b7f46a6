use std::fmt;

use codespan_reporting::files::Files;

use crate::span::Position;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub filename: String,
    pub source: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            filename: filename.into(),
            line_starts: codespan_reporting::files::line_starts(&source).collect(),
            source,
        }
    }

    /// Resolves a byte offset to a 0-based line/column position.
    ///
    /// Offsets past the end of the file clamp to the last position.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|next_line| next_line - 1);
        Position {
            offset,
            line,
            column: offset - self.line_starts[line],
        }
    }

    fn line_start(&self, line_index: usize) -> Result<usize, codespan_reporting::files::Error> {
        use std::cmp::Ordering;

        match line_index.cmp(&self.line_starts.len()) {
            Ordering::Less => Ok(self
                .line_starts
                .get(line_index)
                .cloned()
                .expect("failed despite previous check")),
            Ordering::Equal => Ok(self.source.len()),
            Ordering::Greater => Err(codespan_reporting::files::Error::LineTooLarge {
                given: line_index,
                max: self.line_starts.len() - 1,
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceFileSet {
    pub source_files: Vec<SourceFile>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceFileId(usize);

impl fmt::Debug for SourceFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceFileId({})", self.0)
    }
}

impl SourceFileSet {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add(&mut self, file: SourceFile) -> SourceFileId {
        let id = SourceFileId(self.source_files.len());
        self.source_files.push(file);
        id
    }

    pub fn get(&self, id: SourceFileId) -> &SourceFile {
        &self.source_files[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceFileId, &'_ SourceFile)> {
        self.source_files
            .iter()
            .enumerate()
            .map(|(index, file)| (SourceFileId(index), file))
    }
}

impl<'f> Files<'f> for SourceFileSet {
    type FileId = SourceFileId;
    type Name = &'f str;
    type Source = &'f str;

    fn name(&'f self, id: Self::FileId) -> Result<Self::Name, codespan_reporting::files::Error> {
        Ok(&self.source_files[id.0].filename)
    }

    fn source(
        &'f self,
        id: Self::FileId,
    ) -> Result<Self::Source, codespan_reporting::files::Error> {
        Ok(&self.source_files[id.0].source)
    }

    fn line_index(
        &'f self,
        id: Self::FileId,
        byte_index: usize,
    ) -> Result<usize, codespan_reporting::files::Error> {
        Ok(self.source_files[id.0]
            .line_starts
            .binary_search(&byte_index)
            .unwrap_or_else(|next_line| next_line - 1))
    }

    fn line_range(
        &'f self,
        id: Self::FileId,
        line_index: usize,
    ) -> Result<std::ops::Range<usize>, codespan_reporting::files::Error> {
        let file = &self.source_files[id.0];
        let line_start = file.line_start(line_index)?;
        let next_line_start = file.line_start(line_index + 1)?;
        Ok(line_start..next_line_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_at_resolves_lines_and_columns() {
        let file = SourceFile::new("test.ink", "let x = 1;\nlet y = 2;\n");
        assert_eq!(
            file.position_at(0),
            Position {
                offset: 0,
                line: 0,
                column: 0
            }
        );
        assert_eq!(
            file.position_at(15),
            Position {
                offset: 15,
                line: 1,
                column: 4
            }
        );
    }

    #[test]
    fn position_at_clamps_past_the_end() {
        let file = SourceFile::new("test.ink", "x");
        let position = file.position_at(100);
        assert_eq!(position.offset, 1);
        assert_eq!(position.line, 0);
    }
}
