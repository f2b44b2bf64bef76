use crate::col::Column;
use crate::constant::CapabilityFlags;
use crate::error::{Error, Result};
use crate::protocol::command::prepared::{Prepare, PrepareEvent, PrepareOk};
use crate::protocol::r#trait::params::Params;

/// A statement prepared on the server with `COM_STMT_PREPARE`
///
/// The statement belongs to the connection that prepared it. Close it with
/// `Conn::close_statement`; otherwise the server frees it when the connection ends.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    id: u32,
    params: Vec<Column>,
    columns: Vec<Column>,
    warnings: u16,
}

impl PreparedStatement {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Definitions of the `?` placeholders
    pub fn params(&self) -> &[Column] {
        &self.params
    }

    /// Columns of the result set, if the statement produces one
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn warnings(&self) -> u16 {
        self.warnings
    }

    /// Fails with `BadUsageError` unless `params` binds every placeholder
    pub(crate) fn check_arity<P: Params>(&self, params: &P) -> Result<()> {
        if params.len() != self.num_params() {
            return Err(Error::BadUsageError(format!(
                "statement {} expects {} parameters, got {}",
                self.id,
                self.num_params(),
                params.len()
            )));
        }
        Ok(())
    }
}

/// Collects the packets of a `COM_STMT_PREPARE` response into a [`PreparedStatement`]
#[derive(Debug)]
pub(crate) struct PrepareReader {
    prepare: Prepare,
    ok: Option<PrepareOk>,
    params: Vec<Column>,
    columns: Vec<Column>,
}

impl PrepareReader {
    pub(crate) fn new(capability_flags: CapabilityFlags) -> Self {
        Self {
            prepare: Prepare::new(capability_flags),
            ok: None,
            params: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Feed the next packet. Returns the statement once the response is complete.
    pub(crate) fn feed(&mut self, payload: &[u8]) -> Result<Option<PreparedStatement>> {
        match self.prepare.drive(payload)? {
            PrepareEvent::Prepared(ok) => {
                self.params.reserve(usize::from(ok.num_params()));
                self.columns.reserve(usize::from(ok.num_columns()));
                self.ok = Some(ok);
            }
            PrepareEvent::Param(definition) => self.params.push(Column::try_from(definition)?),
            PrepareEvent::Column(definition) => self.columns.push(Column::try_from(definition)?),
            PrepareEvent::BlockEnd => {}
        }

        if !self.prepare.is_finished() {
            return Ok(None);
        }
        let Some(ok) = self.ok else {
            return Ok(None);
        };
        tracing::debug!(
            statement_id = ok.statement_id(),
            num_params = self.params.len(),
            num_columns = self.columns.len(),
            "statement prepared"
        );
        Ok(Some(PreparedStatement {
            id: ok.statement_id(),
            params: std::mem::take(&mut self.params),
            columns: std::mem::take(&mut self.columns),
            warnings: ok.warning_count(),
        }))
    }
}
