//! Adapters from plain functions to registry invokers.
//!
//! Any function taking the target (`&T` for blocking handlers, `Arc<T>` for
//! async ones) followed by up to eight [`CommandParam`] values is a
//! handler. The parameter list is inspected once when the command is
//! registered; each call only extracts values.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::{ArgumentError, CommandParam, Invocation, ParamSpec};
use crate::command::{CommandResult, IntoCommandResult};

/// Marker for handlers that run to completion without awaiting.
#[doc(hidden)]
#[derive(Debug)]
pub struct Blocking;

/// Marker for handlers returning a future.
#[doc(hidden)]
#[derive(Debug)]
pub struct Async;

/// Function usable as a command implementation on target type `T`.
///
/// `M` is inferred and only distinguishes the blanket implementations.
pub trait Handler<T, M>: Clone + Send + Sync + 'static {
    /// Parameter specs in declaration order, excluding the target.
    fn params() -> Vec<ParamSpec>;

    /// Binds the invocation's arguments and returns the call as a future.
    ///
    /// # Errors
    ///
    /// Returns an [`ArgumentError`] when a token fails to bind; the handler
    /// body is not entered in that case.
    fn bind(
        self,
        target: Arc<T>,
        invocation: Invocation,
    ) -> Result<BoxFuture<'static, CommandResult>, ArgumentError>;
}

macro_rules! impl_handler {
    ($($param:ident),*) => {
        impl<F, R, T, $($param,)*> Handler<T, (Blocking, R, $($param,)*)> for F
        where
            F: Fn(&T, $($param,)*) -> R + Clone + Send + Sync + 'static,
            R: IntoCommandResult,
            T: Send + Sync + 'static,
            $($param: CommandParam,)*
        {
            fn params() -> Vec<ParamSpec> {
                vec![$($param::spec(),)*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables, reason = "generated per arity")]
            fn bind(
                self,
                target: Arc<T>,
                mut invocation: Invocation,
            ) -> Result<BoxFuture<'static, CommandResult>, ArgumentError> {
                $(let $param = $param::extract(&mut invocation)?;)*
                Ok(Box::pin(async move {
                    (self)(&target, $($param,)*).into_command_result()
                }))
            }
        }

        impl<F, Fut, R, T, $($param,)*> Handler<T, (Async, R, $($param,)*)> for F
        where
            F: Fn(Arc<T>, $($param,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoCommandResult,
            T: Send + Sync + 'static,
            $($param: CommandParam,)*
        {
            fn params() -> Vec<ParamSpec> {
                vec![$($param::spec(),)*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables, reason = "generated per arity")]
            fn bind(
                self,
                target: Arc<T>,
                mut invocation: Invocation,
            ) -> Result<BoxFuture<'static, CommandResult>, ArgumentError> {
                $(let $param = $param::extract(&mut invocation)?;)*
                let future = (self)(target, $($param,)*);
                Ok(Box::pin(async move { future.await.into_command_result() }))
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);
