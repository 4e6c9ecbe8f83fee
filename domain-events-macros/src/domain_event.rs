use proc_macro2::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    DeriveInput, Expr, Ident, Result, Token,
    parse::{Parse, ParseStream},
};

/// `#[derive(DomainEvent)]` 展开：生成 `EVENT_TYPE` 常量
pub(crate) fn expand(input: DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "#[derive(DomainEvent)] does not support generic types",
        ));
    }

    let ident = &input.ident;
    let ident_str = ident.to_string();

    let mut name: Option<syn::LitStr> = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("domain_event")) {
        let pairs =
            attr.parse_args_with(Punctuated::<DomainEventAttrKv, Token![,]>::parse_terminated)?;

        for kv in pairs {
            match kv.key.to_string().as_str() {
                "name" => {
                    if name.is_some() {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "duplicate key 'name' in attribute",
                        ));
                    }
                    let lit = match kv.value {
                        Expr::Lit(syn::ExprLit {
                            lit: syn::Lit::Str(lit),
                            ..
                        }) => lit,
                        other => {
                            return Err(syn::Error::new(
                                other.span(),
                                "expected string literal for 'name'",
                            ));
                        }
                    };
                    if lit.value().trim().is_empty() {
                        return Err(syn::Error::new(lit.span(), "'name' must not be empty"));
                    }
                    name = Some(lit);
                }
                other => {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        format!("unknown key '{other}' in #[domain_event(...)]"),
                    ));
                }
            }
        }
    }

    let event_type = match name {
        Some(lit) => quote! { #lit },
        None => quote! { ::core::concat!(::core::module_path!(), "::", #ident_str) },
    };

    Ok(quote! {
        impl ::domain_events::domain_event::DomainEvent for #ident {
            const EVENT_TYPE: &'static str = #event_type;
        }
    })
}

struct DomainEventAttrKv {
    key: Ident,
    value: Expr,
}

impl Parse for DomainEventAttrKv {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        input.parse::<Token![=]>()?;
        let value: Expr = input.parse()?;
        Ok(Self { key, value })
    }
}
