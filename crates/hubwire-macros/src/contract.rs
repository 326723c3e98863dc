//! `#[contract]` implementation

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{
    Attribute, FnArg, Ident, ItemTrait, LitStr, Pat, Path, ReturnType, TraitItem, TraitItemFn,
    Type, parse_macro_input, parse_quote,
};

use crate::naming::RenameRule;

struct ContractOptions {
    krate: Path,
    rename_all: RenameRule,
}

impl Default for ContractOptions {
    fn default() -> Self {
        Self {
            krate: parse_quote!(::hubwire),
            rename_all: RenameRule::None,
        }
    }
}

struct ContractMethod {
    ident: Ident,
    wire_name: String,
    docs: Vec<Attribute>,
    params: Vec<(Ident, Type)>,
    output: Type,
}

pub fn contract_impl(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut options = ContractOptions::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("rename_all") {
            let value: LitStr = meta.value()?.parse()?;
            options.rename_all = RenameRule::parse(&value.value()).ok_or_else(|| {
                syn::Error::new(
                    value.span(),
                    "expected one of \"PascalCase\", \"camelCase\", \"snake_case\"",
                )
            })?;
            Ok(())
        } else if meta.path.is_ident("crate") {
            let value: LitStr = meta.value()?.parse()?;
            options.krate = value.parse()?;
            Ok(())
        } else {
            Err(meta.error("unsupported contract option"))
        }
    });
    parse_macro_input!(args with parser);

    let item = parse_macro_input!(input as ItemTrait);
    match expand(item, &options) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(mut item: ItemTrait, options: &ContractOptions) -> syn::Result<TokenStream2> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "contract traits cannot be generic",
        ));
    }

    let mut methods = Vec::with_capacity(item.items.len());
    for trait_item in &mut item.items {
        match trait_item {
            TraitItem::Fn(method) => methods.push(parse_method(method, options.rename_all)?),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "contract traits may only declare methods",
                ));
            }
        }
    }

    let krate = &options.krate;
    let vis = &item.vis;
    let trait_ident = &item.ident;
    let trait_name = trait_ident.to_string();
    let calls_ident = format_ident!("{}Calls", trait_ident);
    let members_ident = format_ident!("{}Members", trait_ident);
    let calls_doc = format!("Call shape of the `{trait_name}` contract.");
    let members_doc = format!("Member reference shape of the `{trait_name}` contract.");

    let call_fns = methods.iter().map(|method| {
        let ContractMethod {
            ident,
            wire_name,
            docs,
            params,
            output,
        } = method;
        let names: Vec<&Ident> = params.iter().map(|(name, _)| name).collect();
        let types: Vec<&Type> = params.iter().map(|(_, ty)| ty).collect();
        quote! {
            #(#docs)*
            pub fn #ident(
                &self,
                #(#names: impl ::core::convert::Into<#krate::contract::Arg<#types>>),*
            ) -> #krate::contract::Call<#output> {
                #krate::contract::Call::new(
                    #wire_name,
                    ::std::vec![
                        #(::core::convert::Into::<#krate::contract::Arg<#types>>::into(#names).into_expr()),*
                    ],
                )
            }
        }
    });

    let member_fns = methods.iter().map(|method| {
        let ident = &method.ident;
        let wire_name = &method.wire_name;
        let docs = &method.docs;
        let types = method.params.iter().map(|(_, ty)| ty);
        quote! {
            #(#docs)*
            pub fn #ident(&self) -> #krate::contract::MemberRef<(#(#types,)*)> {
                #krate::contract::MemberRef::new(#wire_name)
            }
        }
    });

    let member_infos = methods.iter().map(|method| {
        let name = method.ident.to_string();
        let wire_name = &method.wire_name;
        let params = method.params.iter().map(|(_, ty)| type_label(ty));
        let returns = type_label(&method.output);
        quote! {
            #krate::contract::MemberInfo {
                name: #name,
                wire_name: #wire_name,
                params: &[#(#params),*],
                returns: #returns,
            }
        }
    });

    Ok(quote! {
        #item

        #[doc = #calls_doc]
        #[derive(Debug, Default, Clone, Copy)]
        #vis struct #calls_ident {
            _private: (),
        }

        impl #calls_ident {
            #(#call_fns)*
        }

        #[doc = #members_doc]
        #[derive(Debug, Default, Clone, Copy)]
        #vis struct #members_ident {
            _private: (),
        }

        impl #members_ident {
            #(#member_fns)*
        }

        impl #krate::contract::Contract for dyn #trait_ident {
            type Calls = #calls_ident;
            type Members = #members_ident;

            fn info() -> &'static #krate::contract::ContractInfo {
                static INFO: #krate::contract::ContractInfo = #krate::contract::ContractInfo {
                    name: #trait_name,
                    kind: #krate::contract::ContractKind::Interface,
                    members: &[#(#member_infos),*],
                };
                &INFO
            }
        }
    })
}

fn parse_method(method: &mut TraitItemFn, rename_all: RenameRule) -> syn::Result<ContractMethod> {
    let sig = &method.sig;
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "contract methods are declared synchronously, the proxy makes them async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "contract methods cannot be generic",
        ));
    }
    match sig.receiver() {
        Some(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &sig.ident,
                "contract methods must take `&self`",
            ));
        }
    }
    if let Some(body) = &method.default {
        return Err(syn::Error::new_spanned(
            body,
            "contract methods cannot have a default body",
        ));
    }

    let mut params = Vec::new();
    for (index, input) in sig.inputs.iter().enumerate() {
        if let FnArg::Typed(pat_type) = input {
            let name = match &*pat_type.pat {
                Pat::Ident(pat) => pat.ident.clone(),
                _ => format_ident!("arg{}", index),
            };
            params.push((name, (*pat_type.ty).clone()));
        }
    }

    let output = match &sig.output {
        ReturnType::Default => parse_quote!(()),
        ReturnType::Type(_, ty) => (**ty).clone(),
    };

    let ident = sig.ident.clone();
    let mut wire_name = rename_all.apply(&ident.to_string());

    let mut docs = Vec::new();
    let mut kept = Vec::with_capacity(method.attrs.len());
    for attr in method.attrs.drain(..) {
        if attr.path().is_ident("hub") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    wire_name = value.value();
                    Ok(())
                } else {
                    Err(meta.error("unsupported hub option"))
                }
            })?;
            continue;
        }
        if attr.path().is_ident("doc") {
            docs.push(attr.clone());
        }
        kept.push(attr);
    }
    method.attrs = kept;

    Ok(ContractMethod {
        ident,
        wire_name,
        docs,
        params,
        output,
    })
}

/// Renders a type the way it is usually written, `Vec<String>` not `Vec < String >`.
fn type_label(ty: &Type) -> String {
    let raw = ty.to_token_stream().to_string();
    let mut label = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            let prev = label.chars().last();
            let next = chars.peek().copied();
            let glued = matches!(prev, Some('<' | '&' | '(' | '[' | ':'))
                || matches!(next, Some('<' | '>' | ',' | ')' | ']' | ':'));
            if glued && !matches!(prev, Some(',')) {
                continue;
            }
        }
        label.push(c);
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_label() {
        let ty: Type = parse_quote!(Vec<String>);
        assert_eq!(type_label(&ty), "Vec<String>");

        let ty: Type = parse_quote!(std::collections::HashMap<String, (i32, u8)>);
        assert_eq!(type_label(&ty), "std::collections::HashMap<String, (i32, u8)>");

        let ty: Type = parse_quote!(Option<&'static str>);
        assert_eq!(type_label(&ty), "Option<&'static str>");
    }

    #[test]
    fn test_parse_method_applies_rename_and_strips_hub_attr() {
        let mut method: TraitItemFn = parse_quote! {
            /// Fetches history.
            #[hub(name = "GetHistory")]
            fn history(&self, count: u32) -> Vec<String>;
        };
        let parsed = parse_method(&mut method, RenameRule::PascalCase).unwrap();
        assert_eq!(parsed.wire_name, "GetHistory");
        assert_eq!(parsed.params.len(), 1);
        assert_eq!(parsed.docs.len(), 1);
        assert!(method.attrs.iter().all(|attr| !attr.path().is_ident("hub")));

        let mut method: TraitItemFn = parse_quote!(fn send_all(&self, text: String););
        let parsed = parse_method(&mut method, RenameRule::PascalCase).unwrap();
        assert_eq!(parsed.wire_name, "SendAll");
        assert_eq!(type_label(&parsed.output), "()");
    }

    #[test]
    fn test_parse_method_rejects_non_interface_shapes() {
        let mut owned: TraitItemFn = parse_quote!(fn take(self););
        assert!(parse_method(&mut owned, RenameRule::None).is_err());

        let mut generic: TraitItemFn = parse_quote!(fn put<T>(&self, value: T););
        assert!(parse_method(&mut generic, RenameRule::None).is_err());

        let mut with_body: TraitItemFn = parse_quote!(fn ping(&self) {});
        assert!(parse_method(&mut with_body, RenameRule::None).is_err());
    }

    #[test]
    fn test_expand_rejects_associated_items() {
        let item: ItemTrait = parse_quote! {
            trait Stateful {
                const LIMIT: u32;
                fn ping(&self);
            }
        };
        assert!(expand(item, &ContractOptions::default()).is_err());
    }
}
