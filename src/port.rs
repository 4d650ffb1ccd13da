// ABOUTME: Character stream ports over files and in-memory buffers

use crate::error::{LispError, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
    Both,
}

#[derive(Debug)]
enum PortKind {
    File { file: Option<File>, path: Rc<str> },
    InputString { buffer: Rc<[u8]>, pos: usize },
    OutputString { buffer: Vec<u8> },
}

/// A character stream: file or in-memory buffer, with a one-character
/// lookahead slot and the (row, col) of the next unconsumed character so
/// the reader can stamp token positions.
#[derive(Debug)]
pub struct Port {
    kind: PortKind,
    dir: Direction,
    eof: bool,
    peeked: Option<u8>,
    row: u32,
    col: u32,
}

impl Port {
    fn new(kind: PortKind, dir: Direction) -> Self {
        Port {
            kind,
            dir,
            eof: false,
            peeked: None,
            row: 1,
            col: 1,
        }
    }

    pub fn open_input_file(path: &str) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| LispError::system(format!("{}: {}", path, e)))?;
        Ok(Port::new(
            PortKind::File {
                file: Some(file),
                path: Rc::from(path),
            },
            Direction::Input,
        ))
    }

    pub fn open_output_file(path: &str) -> Result<Self> {
        let file = File::create(path)
            .map_err(|e| LispError::system(format!("{}: {}", path, e)))?;
        Ok(Port::new(
            PortKind::File {
                file: Some(file),
                path: Rc::from(path),
            },
            Direction::Output,
        ))
    }

    pub fn open_input_string(text: &str) -> Self {
        Port::new(
            PortKind::InputString {
                buffer: Rc::from(text.as_bytes()),
                pos: 0,
            },
            Direction::Input,
        )
    }

    pub fn open_output_string() -> Self {
        Port::new(
            PortKind::OutputString { buffer: Vec::new() },
            Direction::Output,
        )
    }

    /// Name used when stamping values read from this port.
    pub fn name(&self) -> Rc<str> {
        match &self.kind {
            PortKind::File { path, .. } => path.clone(),
            _ => Rc::from("<string>"),
        }
    }

    /// Position of the next character `read_char` would return.
    pub fn position(&self) -> (u32, u32) {
        (self.row, self.col)
    }

    pub fn is_input(&self) -> bool {
        matches!(self.dir, Direction::Input | Direction::Both)
    }

    pub fn is_output(&self) -> bool {
        matches!(self.dir, Direction::Output | Direction::Both)
    }

    pub fn at_eof(&self) -> bool {
        self.eof
    }

    fn read_raw(&mut self) -> Result<Option<u8>> {
        match &mut self.kind {
            PortKind::File { file, path } => {
                let f = file
                    .as_mut()
                    .ok_or_else(|| LispError::system("read from closed port"))?;
                let mut byte = [0u8; 1];
                let n = f
                    .read(&mut byte)
                    .map_err(|e| LispError::system(format!("{}: {}", path, e)))?;
                if n == 0 {
                    Ok(None)
                } else {
                    Ok(Some(byte[0]))
                }
            }
            PortKind::InputString { buffer, pos } => {
                if *pos < buffer.len() {
                    let c = buffer[*pos];
                    *pos += 1;
                    Ok(Some(c))
                } else {
                    Ok(None)
                }
            }
            PortKind::OutputString { .. } => {
                Err(LispError::type_error("read from output port"))
            }
        }
    }

    fn advance(&mut self, c: u8) {
        if c == b'\n' {
            self.row += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }

    /// Read one character, draining the peek slot first. `None` at end of
    /// input (and the EOF flag sticks).
    pub fn read_char(&mut self) -> Result<Option<u8>> {
        let c = match self.peeked.take() {
            Some(c) => Some(c),
            None => self.read_raw()?,
        };
        match c {
            Some(c) => {
                self.advance(c);
                Ok(Some(c))
            }
            None => {
                self.eof = true;
                Ok(None)
            }
        }
    }

    /// Look at the next character without consuming it. Buffers exactly one
    /// character; a subsequent `read_char` returns it and clears the slot.
    pub fn peek_char(&mut self) -> Result<Option<u8>> {
        if let Some(c) = self.peeked {
            return Ok(Some(c));
        }
        match self.read_raw()? {
            Some(c) => {
                self.peeked = Some(c);
                Ok(Some(c))
            }
            None => {
                self.eof = true;
                Ok(None)
            }
        }
    }

    pub fn write_char(&mut self, c: u8) -> Result<()> {
        self.write_bytes(&[c])
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.kind {
            PortKind::File { file, path } => {
                let f = file
                    .as_mut()
                    .ok_or_else(|| LispError::system("write to closed port"))?;
                f.write_all(bytes)
                    .map_err(|e| LispError::system(format!("{}: {}", path, e)))
            }
            PortKind::OutputString { buffer } => {
                buffer.extend_from_slice(bytes);
                Ok(())
            }
            PortKind::InputString { .. } => {
                Err(LispError::type_error("write to input port"))
            }
        }
    }

    /// Accumulated contents of an output string port.
    pub fn output_string(&self) -> Result<String> {
        match &self.kind {
            PortKind::OutputString { buffer } => {
                Ok(String::from_utf8_lossy(buffer).into_owned())
            }
            _ => Err(LispError::type_error("not a string output port")),
        }
    }

    /// Release the underlying resource. For file ports this closes the
    /// descriptor; later reads or writes are `system` errors.
    pub fn close(&mut self) {
        if let PortKind::File { file, .. } = &mut self.kind {
            *file = None;
        }
        self.peeked = None;
        self.eof = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_port_read_and_eof() {
        let mut p = Port::open_input_string("ab");
        assert_eq!(p.read_char().unwrap(), Some(b'a'));
        assert_eq!(p.read_char().unwrap(), Some(b'b'));
        assert!(!p.at_eof());
        assert_eq!(p.read_char().unwrap(), None);
        assert!(p.at_eof());
    }

    #[test]
    fn test_peek_buffers_one_char() {
        let mut p = Port::open_input_string("xy");
        assert_eq!(p.peek_char().unwrap(), Some(b'x'));
        assert_eq!(p.peek_char().unwrap(), Some(b'x'));
        assert_eq!(p.read_char().unwrap(), Some(b'x'));
        assert_eq!(p.read_char().unwrap(), Some(b'y'));
        assert_eq!(p.peek_char().unwrap(), None);
        assert!(p.at_eof());
    }

    #[test]
    fn test_position_tracks_rows_and_cols() {
        let mut p = Port::open_input_string("ab\ncd");
        assert_eq!(p.position(), (1, 1));
        p.read_char().unwrap();
        assert_eq!(p.position(), (1, 2));
        // Peeking does not advance the position.
        p.peek_char().unwrap();
        assert_eq!(p.position(), (1, 2));
        p.read_char().unwrap(); // b
        p.read_char().unwrap(); // newline
        assert_eq!(p.position(), (2, 1));
        p.read_char().unwrap(); // c
        assert_eq!(p.position(), (2, 2));
    }

    #[test]
    fn test_output_string_port() {
        let mut p = Port::open_output_string();
        assert!(p.is_output());
        p.write_str("hello ").unwrap();
        p.write_char(b'w').unwrap();
        assert_eq!(p.output_string().unwrap(), "hello w");
    }

    #[test]
    fn test_directions() {
        let p = Port::open_input_string("");
        assert!(p.is_input());
        assert!(!p.is_output());

        let q = Port::open_output_string();
        assert!(!q.is_input());
        assert!(q.is_output());
    }

    #[test]
    fn test_read_from_output_port_fails() {
        let mut p = Port::open_output_string();
        assert!(p.read_raw().is_err());
    }

    #[test]
    fn test_missing_file_is_system_error() {
        let err = Port::open_input_file("/no/such/file/anywhere").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::System);
    }

    #[test]
    fn test_file_port_round_trip() {
        let dir = std::env::temp_dir();
        let path = dir.join("minilisp-port-test.txt");
        let path_str = path.to_string_lossy().into_owned();

        let mut out = Port::open_output_file(&path_str).unwrap();
        out.write_str("(a b)").unwrap();
        out.close();

        let mut inp = Port::open_input_file(&path_str).unwrap();
        assert_eq!(inp.read_char().unwrap(), Some(b'('));
        assert_eq!(inp.peek_char().unwrap(), Some(b'a'));
        inp.close();
        assert!(inp.read_char().is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_closed_file_port_errors() {
        let dir = std::env::temp_dir();
        let path = dir.join("minilisp-port-close-test.txt");
        let path_str = path.to_string_lossy().into_owned();
        std::fs::write(&path, "x").unwrap();

        let mut p = Port::open_input_file(&path_str).unwrap();
        p.close();
        assert!(p.read_raw().is_err());

        let _ = std::fs::remove_file(&path);
    }
}
