use std::collections::HashMap;

use hubwire_core::InvocationDescriptor;

use crate::ContractError;

/// A compile-time description of a remote capability interface.
///
/// Implemented by `#[contract]` for `dyn Trait`, so only trait objects
/// (pure interfaces) can stand in for a contract. Contracts are never
/// instantiated; their generated shapes are what call sites work with.
pub trait Contract {
    /// Call form: one method per contract method, returning a `Call<R>`.
    type Calls: Default;

    /// Reference form: one method per contract method, returning a `MemberRef<A>`.
    type Members: Default;

    fn info() -> &'static ContractInfo;
}

/// What kind of type a contract descriptor was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    /// A trait with only methods.
    Interface,
    /// Anything carrying state or non-method members.
    Concrete,
}

/// Static metadata about one contract.
#[derive(Debug)]
pub struct ContractInfo {
    pub name: &'static str,
    pub kind: ContractKind,
    pub members: &'static [MemberInfo],
}

/// Static metadata about one contract method.
#[derive(Debug)]
pub struct MemberInfo {
    /// The Rust identifier.
    pub name: &'static str,
    /// The name used on the wire.
    pub wire_name: &'static str,
    /// Parameter types as written in the contract.
    pub params: &'static [&'static str],
    /// Return type as written in the contract.
    pub returns: &'static str,
}

impl ContractInfo {
    /// Looks up a member by wire name, ignoring ASCII case like hub names do.
    pub fn member(&self, wire_name: &str) -> Option<&MemberInfo> {
        self.members
            .iter()
            .find(|member| member.wire_name.eq_ignore_ascii_case(wire_name))
    }

    /// Checks that the descriptor names a member and matches its parameter count.
    pub fn check_invocation(&self, descriptor: &InvocationDescriptor) -> Result<(), ContractError> {
        let member = self.member(descriptor.method()).ok_or_else(|| {
            ContractError::InvalidExpressionShape(format!(
                "'{}' is not a member of {}",
                descriptor.method(),
                self.name
            ))
        })?;

        if member.params.len() != descriptor.arity() {
            return Err(ContractError::InvalidExpressionShape(format!(
                "{}.{} takes {} arguments, the call supplies {}",
                self.name,
                member.wire_name,
                member.params.len(),
                descriptor.arity()
            )));
        }
        Ok(())
    }

    /// Checks that a bare member name belongs to this contract.
    pub fn check_member(&self, wire_name: &str) -> Result<&MemberInfo, ContractError> {
        self.member(wire_name).ok_or_else(|| {
            ContractError::InvalidExpressionShape(format!(
                "'{wire_name}' is not a member of {}",
                self.name
            ))
        })
    }

    /// Verifies the descriptor denotes a pure interface with unambiguous wire names.
    pub fn validate(&self) -> Result<(), ContractError> {
        let invalid = |reason: String| ContractError::ContractTypeInvalid {
            name: self.name.to_string(),
            reason,
        };

        if self.kind != ContractKind::Interface {
            return Err(invalid("not an interface".to_string()));
        }

        let mut seen: HashMap<String, &str> = HashMap::with_capacity(self.members.len());
        for member in self.members {
            if member.wire_name.is_empty() {
                return Err(invalid(format!("member '{}' has an empty wire name", member.name)));
            }
            if let Some(previous) = seen.insert(member.wire_name.to_ascii_lowercase(), member.name) {
                return Err(invalid(format!(
                    "members '{previous}' and '{}' share the wire name '{}'",
                    member.name, member.wire_name
                )));
            }
        }
        Ok(())
    }
}

/// Validates the descriptor of `C`.
pub fn validate<C: Contract + ?Sized>() -> Result<&'static ContractInfo, ContractError> {
    let info = C::info();
    info.validate()?;
    Ok(info)
}
