use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod domain_event;

/// 派生 `::domain_events::domain_event::DomainEvent`
///
/// - 默认 `EVENT_TYPE` 为全限定类型名：`concat!(module_path!(), "::", "<Ident>")`
/// - 支持覆写：`#[domain_event(name = "shop.OrderPlaced")]`
/// - 不支持泛型类型（类型名须在编译期确定）
#[proc_macro_derive(DomainEvent, attributes(domain_event))]
pub fn derive_domain_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    domain_event::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
