//! Structured error values raised by domain operations.
//!
//! Unlike [`CellError`](crate::CellError), which reports problems with the
//! cell model itself, an [`ErrorValue`] is a domain-level failure: a code, an
//! optional message and a trace that grows as the error passes up through
//! layers.

use std::fmt;

use crate::address::Address;
use crate::cell::Cell;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    code: Cell,
    message: Option<Cell>,
    trace: Vec<String>,
    log: Option<Cell>,
    address: Option<Address>,
}

impl ErrorValue {
    pub fn new(code: Cell) -> Self {
        Self {
            code,
            message: None,
            trace: Vec::new(),
            log: None,
            address: None,
        }
    }

    pub fn with_message(code: Cell, message: Cell) -> Self {
        Self {
            message: Some(message),
            ..Self::new(code)
        }
    }

    pub fn code(&self) -> &Cell {
        &self.code
    }

    pub fn message(&self) -> Option<&Cell> {
        self.message.as_ref()
    }

    /// Append a trace entry. Entries keep insertion order.
    pub fn add_trace(&mut self, entry: impl Into<String>) {
        self.trace.push(entry.into());
    }

    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Attach a snapshot of the log at the point of failure.
    pub fn set_log(&mut self, log: Cell) {
        self.log = Some(log);
    }

    pub fn log(&self) -> Option<&Cell> {
        self.log.as_ref()
    }

    /// Record the address where the error originated.
    pub fn set_address(&mut self, address: Address) {
        self.address = Some(address);
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    /// Convert to a map cell with `:code`, `:message`, `:trace` and
    /// `:address` entries. Absent fields are omitted.
    pub fn to_cell(&self) -> Result<Cell> {
        let mut entries = vec![(Cell::keyword("code")?, self.code.clone())];
        if let Some(message) = &self.message {
            entries.push((Cell::keyword("message")?, message.clone()));
        }
        if !self.trace.is_empty() {
            let trace = Cell::vector(self.trace.iter().map(|t| Cell::string(t.as_str())));
            entries.push((Cell::keyword("trace")?, trace));
        }
        if let Some(address) = self.address {
            entries.push((Cell::keyword("address")?, Cell::address(address)));
        }
        Ok(Cell::map(entries))
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorValue[{}]", self.code)?;
        if let Some(message) = &self.message {
            write!(f, " : {}", message)?;
        }
        for entry in &self.trace {
            write!(f, "\n{}", entry)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorValue {}
