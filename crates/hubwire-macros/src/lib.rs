//! Procedural macros for hubwire.

use proc_macro::TokenStream;

mod contract;
mod naming;

/// Turns a trait into a hub contract.
///
/// Generates:
/// - `<Trait>Calls`: one method per contract method, taking each parameter as
///   `impl Into<Arg<T>>` and returning `Call<R>`
/// - `<Trait>Members`: one method per contract method returning
///   `MemberRef<(T1, .., Tn)>`, used to register event callbacks
/// - `impl Contract for dyn Trait` with the static `ContractInfo`
///
/// Options: `rename_all = "PascalCase" | "camelCase" | "snake_case"` and
/// `crate = "path"` (defaults to `::hubwire`). A method can override its
/// wire name with `#[hub(name = "...")]`.
#[proc_macro_attribute]
pub fn contract(args: TokenStream, input: TokenStream) -> TokenStream {
    contract::contract_impl(args, input)
}
