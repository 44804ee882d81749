use proc_macro::TokenStream;
use quote::quote;

use syn::spanned::Spanned as _;
use syn::{
    Data, DeriveInput, Error, FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl,
    PathArguments, ReturnType, Type, Visibility,
};

fn extract_generic_type(ty: &Type, wrapper: &str) -> Option<Type> {
    if let Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == wrapper
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(GenericArgument::Type(inner)) = args.args.first()
    {
        return Some(inner.clone());
    }
    None
}

const INJECT_ATTR: &str = "inject";

/// Derive macro for the Injectable trait
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    handle_derive_inject(input)
}

/// Attribute macro indexing the factory operations of a provider impl block
#[proc_macro_attribute]
pub fn provider(_attr: TokenStream, item: TokenStream) -> TokenStream {
    if let Ok(item_impl) = syn::parse::<ItemImpl>(item) {
        return handle_provider_impl(item_impl);
    }
    TokenStream::from(
        Error::new(
            proc_macro2::Span::call_site(),
            "#[provider] can only be applied to impl blocks",
        )
        .to_compile_error(),
    )
}

fn handle_derive_inject(input: DeriveInput) -> TokenStream {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(s) => &s.fields,
        _ => {
            return TokenStream::from(
                Error::new(name.span(), "Only structs are supported").to_compile_error(),
            );
        }
    };

    let mut attributes = Vec::new();

    match fields {
        syn::Fields::Named(fields) => {
            for field in &fields.named {
                let Some(attr) = field
                    .attrs
                    .iter()
                    .find(|attr| attr.path().is_ident(INJECT_ATTR))
                else {
                    continue;
                };
                if let Err(err) = attr.meta.require_path_only() {
                    return TokenStream::from(err.to_compile_error());
                }
                let field_ident = field.ident.as_ref().unwrap();
                let field_name = field_ident.to_string();
                let field_ty = &field.ty;

                if let Some(inner_type) = extract_generic_type(field_ty, "Option") {
                    attributes.push(quote! {
                        ::ferrule::Attribute::<Self>::optional::<#inner_type>(
                            #field_name,
                            |target: &mut Self| &mut target.#field_ident,
                        )
                    });
                } else {
                    attributes.push(quote! {
                        ::ferrule::Attribute::<Self>::new::<#field_ty>(
                            #field_name,
                            |target: &mut Self| &mut target.#field_ident,
                        )
                    });
                }
            }
        }
        syn::Fields::Unnamed(_) => {
            return TokenStream::from(
                Error::new(name.span(), "Tuple structs are not supported").to_compile_error(),
            );
        }
        syn::Fields::Unit => {}
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics ::ferrule::Injectable for #name #ty_generics #where_clause {
            fn attributes() -> ::std::vec::Vec<::ferrule::Attribute<Self>> {
                ::std::vec![#(#attributes),*]
            }
        }
    }
    .into()
}

fn handle_provider_impl(input: ItemImpl) -> TokenStream {
    if input.trait_.is_some() {
        return TokenStream::from(
            Error::new(input.span(), "Trait impls are not supported").to_compile_error(),
        );
    }

    let self_ty = &input.self_ty;
    let mut registrations = Vec::new();

    for item in &input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        if !is_factory_operation(method) {
            continue;
        }
        if method.sig.asyncness.is_some() {
            return TokenStream::from(
                Error::new(
                    method.sig.span(),
                    "Async factory operations are not supported",
                )
                .to_compile_error(),
            );
        }
        if !method.sig.generics.params.is_empty() {
            return TokenStream::from(
                Error::new(
                    method.sig.generics.span(),
                    "Generic factory operations are not supported",
                )
                .to_compile_error(),
            );
        }
        let return_type = match &method.sig.output {
            // Nothing to produce.
            ReturnType::Default => continue,
            ReturnType::Type(_, ty) => ty.as_ref(),
        };

        let method_ident = &method.sig.ident;
        let method_name = method_ident.to_string();
        let arity = method.sig.inputs.len() - 1;
        let (produced_type, is_result) = match extract_generic_type(return_type, "Result") {
            Some(v) => (v, true),
            None => (return_type.clone(), false),
        };
        // Getters returning borrowed values are not factories.
        if borrows(&produced_type) {
            continue;
        }
        let contextual =
            arity == 1 && method.sig.inputs.iter().nth(1).is_some_and(is_context_arg);

        let registration = match (arity, is_result) {
            (0, false) => quote! {
                registry.factory::<#produced_type, _>(
                    #method_name,
                    |provider: &Self| provider.#method_ident(),
                );
            },
            (0, true) => quote! {
                registry.try_factory::<#produced_type, _, _>(
                    #method_name,
                    |provider: &Self| provider.#method_ident(),
                );
            },
            (1, false) if contextual => quote! {
                registry.contextual::<#produced_type, _>(
                    #method_name,
                    |provider: &Self, ctx: &::ferrule::Context| provider.#method_ident(ctx),
                );
            },
            (1, true) if contextual => quote! {
                registry.try_contextual::<#produced_type, _, _>(
                    #method_name,
                    |provider: &Self, ctx: &::ferrule::Context| provider.#method_ident(ctx),
                );
            },
            _ => quote! {
                registry.unsupported::<#produced_type>(#method_name, #arity);
            },
        };
        registrations.push(registration);
    }

    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    quote! {
        #input

        impl #impl_generics ::ferrule::Factories for #self_ty #where_clause {
            #[allow(unused_variables)]
            fn factories(registry: &mut ::ferrule::FactoryRegistryBuilder<Self>) {
                #(#registrations)*
            }
        }
    }
    .into()
}

// Public methods borrowing the provider immutably.
fn is_factory_operation(method: &ImplItemFn) -> bool {
    if !matches!(method.vis, Visibility::Public(_)) {
        return false;
    }
    match method.sig.receiver() {
        Some(receiver) => receiver.reference.is_some() && receiver.mutability.is_none(),
        None => false,
    }
}

// `&Context` under any path, e.g. `&::ferrule::Context`.
fn is_context_arg(arg: &FnArg) -> bool {
    if let FnArg::Typed(pat_type) = arg
        && let Type::Reference(reference) = pat_type.ty.as_ref()
        && reference.mutability.is_none()
        && let Type::Path(type_path) = reference.elem.as_ref()
        && let Some(segment) = type_path.path.segments.last()
    {
        return segment.ident == "Context" && segment.arguments.is_empty();
    }
    false
}

fn borrows(ty: &Type) -> bool {
    match ty {
        Type::Reference(_) | Type::TraitObject(_) | Type::ImplTrait(_) => true,
        Type::Paren(v) => borrows(&v.elem),
        Type::Group(v) => borrows(&v.elem),
        Type::Array(v) => borrows(&v.elem),
        Type::Slice(v) => borrows(&v.elem),
        Type::Tuple(v) => v.elems.iter().any(borrows),
        Type::Path(v) => v.path.segments.iter().any(|segment| {
            let PathArguments::AngleBracketed(args) = &segment.arguments else {
                return false;
            };
            args.args.iter().any(|arg| match arg {
                GenericArgument::Lifetime(lifetime) => lifetime.ident != "static",
                GenericArgument::Type(ty) => borrows(ty),
                _ => false,
            })
        }),
        _ => false,
    }
}
