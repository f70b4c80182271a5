// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The error handling system used across the crate.
//!
//! Each module defines a concrete error enum implementing [`CoreError`]; the
//! enum is wrapped in [`Error`], which carries optional context strings and
//! the chain of source errors.  Constructed errors are logged as warnings
//! through the [`log`] facade, with the construction site as the log target.
//!
//! Propagation rules:
//!
//! * [`Error::root`] creates the initial error at the place a check fails.
//! * [`ForeignError::foreign_err`] converts an error from outside this system
//!   (e.g. a [`serde_json`] or [`chrono`] error) while keeping it as source.
//! * [`PropagateError::with_err`] / [`PropagateError::match_err`] convert
//!   between our own error types while keeping the chain.
//! * [`ErrorContext::ctx`] attaches extra context to an existing error.
//!
//! [`Error`]'s `Display` renders the whole chain as a single flat English
//! string (`outer: inner: root`), which is what the verification API hands to
//! callers.

use std::panic::Location;

/// The marker trait required of all concrete error types wrapped by [`Error`].
pub trait CoreError: std::fmt::Display + Send + Sync + 'static {}

/// Wrapper used for all errors in this crate.
///
/// It carries the concrete error variant, any number of context strings, and
/// the source error that caused it, if any.  Concrete error types should not
/// implement [`std::error::Error`] themselves; this wrapper does.
pub struct Error<E>
where
    E: CoreError,
{
    /// The concrete error variant.
    pub error: E,
    /// Additional context attached via [`Error::ctx`].
    context: Vec<Box<dyn std::fmt::Display + Send + Sync>>,
    /// The error that caused this one, if any.
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// The [`std::result::Result`] alias wrapping the error into [`Error`].
pub type Result<T, E> = std::result::Result<T, Error<E>>;

impl<E> Error<E>
where
    E: CoreError,
{
    /// Creates a root error (one without a source) and logs a warning.
    ///
    /// Use this where an error condition is first detected.  To propagate an
    /// existing error, use the [`ForeignError`] or [`PropagateError`] traits
    /// instead, so the source chain is preserved.
    #[track_caller]
    pub fn root(error: E) -> Self {
        Self {
            error,
            context: Vec::new(),
            source: None,
        }
        .log_warn(Location::caller())
    }

    fn from_source(error: E, source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self {
            error,
            context: Vec::new(),
            source: Some(source),
        }
    }

    /// Attaches additional context to the error and returns it.
    ///
    /// Context can be added multiple times; all of it ends up in the rendered
    /// message.
    pub fn ctx<C>(mut self, context: C) -> Self
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.context.push(Box::new(context));
        self
    }

    fn log_warn(self, location: &'static Location<'static>) -> Self {
        log::warn!(target: &location.to_string(), "{}", self);
        self
    }
}

impl<E> std::fmt::Display for Error<E>
where
    E: CoreError,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        for context in &self.context {
            write!(f, " ({context})")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl<E> std::fmt::Debug for Error<E>
where
    E: CoreError,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl<E> std::error::Error for Error<E>
where
    E: CoreError,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|source| source.as_ref() as _)
    }
}

/// Trait for converting foreign errors into our [`Error`] system.
///
/// A "foreign" error is anything implementing [`std::error::Error`] that is
/// not itself an [`Error`].  Do not use this for errors that are already in
/// our system; use [`PropagateError`] for those.
pub trait ForeignError<T, E>
where
    E: CoreError,
{
    /// Maps `Result<T, S>` to `Result<T, Error<E>>`, keeping the foreign
    /// error as source and logging a warning.
    fn foreign_err<F>(self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> E;
}

impl<T, S, E> ForeignError<T, E> for std::result::Result<T, S>
where
    S: std::error::Error + Send + Sync + 'static,
    E: CoreError,
{
    #[track_caller]
    fn foreign_err<F>(self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> E,
    {
        let location = Location::caller();
        self.map_err(|source| Error::from_source(f(), Box::new(source)).log_warn(location))
    }
}

/// Trait for propagating errors that are already inside our [`Error`] system.
pub trait PropagateError<T, S, E>
where
    S: CoreError,
    E: CoreError,
{
    /// Maps `Result<T, Error<S>>` to `Result<T, Error<E>>`, keeping the inner
    /// error as source.
    fn with_err<F>(self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> E;

    /// Like [`PropagateError::with_err`], but the new error may be chosen by
    /// inspecting the source error variant.
    fn match_err<F>(self, f: F) -> Result<T, E>
    where
        F: FnOnce(&S) -> E;
}

impl<T, S, E> PropagateError<T, S, E> for Result<T, S>
where
    S: CoreError,
    E: CoreError,
{
    fn with_err<F>(self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> E,
    {
        self.map_err(|source| Error::from_source(f(), Box::new(source)))
    }

    fn match_err<F>(self, f: F) -> Result<T, E>
    where
        F: FnOnce(&S) -> E,
    {
        self.map_err(|source| {
            let error = f(&source.error);
            Error::from_source(error, Box::new(source))
        })
    }
}

/// Extension trait attaching context to the error variant of a [`Result`].
pub trait ErrorContext<T, E>
where
    E: CoreError,
{
    /// Attaches lazily evaluated context to the [`Err`] variant.
    fn ctx<C, F>(self, f: F) -> Result<T, E>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T, E> for Result<T, E>
where
    E: CoreError,
{
    fn ctx<C, F>(self, f: F) -> Result<T, E>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| error.ctx(f()))
    }
}
