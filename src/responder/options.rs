//! Reply option assembly.
//!
//! Base options keep insertion order. When the client sends a parameter
//! request list, only the listed codes are returned, in the client's order
//! (RFC 2131 §4.3.1). PXE options are appended last either way.

use crate::domain::{OptionCode, ReplyOption};

/// Ordered set of reply options, at most one per code.
#[derive(Debug, Clone, Default)]
pub struct ReplyOptions {
    options: Vec<ReplyOption>,
}

impl ReplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `code`. Replacing an existing code keeps its original position.
    pub fn insert(&mut self, code: OptionCode, value: impl Into<Vec<u8>>) -> &mut Self {
        let value = value.into();
        match self.options.iter_mut().find(|opt| opt.code == code) {
            Some(existing) => existing.value = value,
            None => self.options.push(ReplyOption::new(code, value)),
        }
        self
    }

    /// Options named in `order`, in that order; all options when `order` is `None`.
    ///
    /// Codes the client asks for but that were never assembled are skipped,
    /// as are repeats of a code already selected.
    pub fn select_order_or_all(&self, order: Option<&[u8]>) -> Vec<ReplyOption> {
        let Some(order) = order else {
            return self.options.clone();
        };

        let mut selected: Vec<ReplyOption> = Vec::with_capacity(order.len());
        for &code in order {
            let Some(code) = OptionCode::from_u8(code) else {
                continue;
            };
            if selected.iter().any(|opt| opt.code == code) {
                continue;
            }
            if let Some(opt) = self.options.iter().find(|opt| opt.code == code) {
                selected.push(opt.clone());
            }
        }
        selected
    }
}
