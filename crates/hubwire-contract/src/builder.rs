use std::marker::PhantomData;

use serde::Serialize;

use crate::{Expr, Lambda};

/// A typed argument expression for a contract parameter of type `T`.
///
/// Plain values convert into constants; [`Arg::captured`] records a named
/// local, and [`Arg::from_expr`] accepts any value expression.
pub struct Arg<T> {
    expr: Expr,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Arg<T> {
    /// Wraps an arbitrary expression. Its value is not type checked against `T`.
    pub fn from_expr(expr: Expr) -> Self {
        Self {
            expr,
            _marker: PhantomData,
        }
    }

    pub fn captured(name: impl Into<String>, value: &T) -> Self
    where
        T: Serialize,
    {
        Self::from_expr(Expr::captured(name, value))
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

impl<T: Serialize> From<T> for Arg<T> {
    fn from(value: T) -> Self {
        Self::from_expr(Expr::constant(&value))
    }
}

impl From<&str> for Arg<String> {
    fn from(value: &str) -> Self {
        Self::from_expr(Expr::constant(value))
    }
}

impl<T> Clone for Arg<T> {
    fn clone(&self) -> Self {
        Self::from_expr(self.expr.clone())
    }
}

impl<T> std::fmt::Debug for Arg<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Arg").field(&self.expr).finish()
    }
}

/// A call on a contract method whose result decodes as `R`.
#[must_use = "a call does nothing until it is handed to a proxy"]
pub struct Call<R> {
    lambda: Lambda,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Call<R> {
    /// `|c| c.method(args..)`
    pub fn new(method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::from_lambda(Lambda::new(Expr::parameter().call(method, args)))
    }

    /// Wraps a hand built lambda. Its shape is checked when it is analyzed.
    pub fn from_lambda(lambda: Lambda) -> Self {
        Self {
            lambda,
            _marker: PhantomData,
        }
    }

    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    pub fn into_lambda(self) -> Lambda {
        self.lambda
    }
}

impl<R> std::fmt::Debug for Call<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Call").field(&self.lambda).finish()
    }
}

/// A reference to a contract member whose payload decodes as the tuple `A`.
#[must_use = "a member reference does nothing until it is handed to a proxy"]
pub struct MemberRef<A> {
    lambda: Lambda,
    _marker: PhantomData<fn(A)>,
}

impl<A> MemberRef<A> {
    /// `|c| c.name`
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_lambda(Lambda::new(Expr::parameter().member(name)))
    }

    pub fn from_lambda(lambda: Lambda) -> Self {
        Self {
            lambda,
            _marker: PhantomData,
        }
    }

    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }
}

impl<A> std::fmt::Debug for MemberRef<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MemberRef").field(&self.lambda).finish()
    }
}
