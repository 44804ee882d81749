use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, LitStr, parse_macro_input};

/// Implements `ConfigSection` for a struct, keyed by the given section name.
#[proc_macro_attribute]
pub fn config_section(args: TokenStream, input: TokenStream) -> TokenStream {
    let key = parse_macro_input!(args as LitStr);
    let section = parse_macro_input!(input as ItemStruct);

    let section_name = &section.ident;
    let (impl_generics, ty_generics, where_clause) = section.generics.split_for_impl();

    let expanded = quote! {
        #section

        impl #impl_generics ::ferrule_base::ConfigSection for #section_name #ty_generics #where_clause {
            fn key() -> &'static str {
                #key
            }
        }
    };

    TokenStream::from(expanded)
}
