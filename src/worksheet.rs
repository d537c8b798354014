//! Draft parameters bound to a calculator.
//!
//! A [`Worksheet`] keeps the parameters being edited apart from the last computed
//! result. Editing never recomputes; only [`Worksheet::submit`] does.

use std::fmt;

use crate::error::CalcResult;

/// A pure calculation from a parameter struct to a result struct.
pub trait Calculator {
    type Params: Clone + PartialEq;
    type Output;

    fn compute(params: &Self::Params) -> CalcResult<Self::Output>;
}

struct Computed<C: Calculator> {
    params: C::Params,
    output: C::Output,
}

/// Editable parameter draft plus the last result computed from it.
pub struct Worksheet<C: Calculator> {
    draft: C::Params,
    computed: Option<Computed<C>>,
}

// Derives would bound `C` itself; the bounds belong on the associated types.
impl<C: Calculator> Clone for Computed<C>
where
    C::Output: Clone,
{
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            output: self.output.clone(),
        }
    }
}

impl<C: Calculator> Clone for Worksheet<C>
where
    C::Output: Clone,
{
    fn clone(&self) -> Self {
        Self {
            draft: self.draft.clone(),
            computed: self.computed.clone(),
        }
    }
}

impl<C: Calculator> fmt::Debug for Worksheet<C>
where
    C::Params: fmt::Debug,
    C::Output: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worksheet")
            .field("draft", &self.draft)
            .field("computed_params", &self.computed_params())
            .field("result", &self.result())
            .finish()
    }
}

impl<C: Calculator> Worksheet<C> {
    /// Starts a worksheet with `params` as the draft and no result.
    pub fn new(params: C::Params) -> Self {
        Self {
            draft: params,
            computed: None,
        }
    }

    pub fn draft(&self) -> &C::Params {
        &self.draft
    }

    /// Mutable access to the draft. The last result is kept as-is.
    pub fn draft_mut(&mut self) -> &mut C::Params {
        &mut self.draft
    }

    /// Computes the current draft and stores the result.
    ///
    /// On error the previous result stays in place.
    pub fn submit(&mut self) -> CalcResult<&C::Output> {
        let output = C::compute(&self.draft)?;
        let computed = self.computed.insert(Computed {
            params: self.draft.clone(),
            output,
        });
        Ok(&computed.output)
    }

    pub fn result(&self) -> Option<&C::Output> {
        self.computed.as_ref().map(|computed| &computed.output)
    }

    /// Parameters the current result was computed from.
    pub fn computed_params(&self) -> Option<&C::Params> {
        self.computed.as_ref().map(|computed| &computed.params)
    }

    /// True when there is no result yet or the draft was edited since the last submit.
    pub fn is_stale(&self) -> bool {
        self.computed_params() != Some(&self.draft)
    }
}
