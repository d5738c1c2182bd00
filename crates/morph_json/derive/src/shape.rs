use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Path, Token};

use crate::SHAPE_ATTRIBUTE;

// -----------------------------------------------------------------------------
// Parsed configuration

struct ContainerConfig {
    /// Traits this struct is nominated for, from `implements(...)`.
    interfaces: Vec<Path>,
    auto_register: bool,
}

struct FieldConfig {
    ident: Ident,
    wire_name: String,
    sets: Vec<String>,
}

// -----------------------------------------------------------------------------
// Expansion

pub fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "`Shape` cannot be derived for generic types",
        ));
    }
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.ident.span(),
            "`Shape` can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new(
            input.ident.span(),
            "`Shape` requires named fields",
        ));
    };

    let container = parse_container_config(&input)?;
    let fields = parse_field_configs(named)?;

    let ident = &input.ident;
    let ident_str = ident.to_string();

    let field_infos = fields.iter().map(|field| {
        let name = &field.wire_name;
        let sets = &field.sets;
        quote! { morph_json::info::FieldInfo::new(#name, &[#(#sets),*]) }
    });

    let field_defs = fields.iter().enumerate().map(|(position, field)| {
        let index = Literal::usize_unsuffixed(position);
        let member = &field.ident;
        quote! {
            morph_json::serde::FieldDef::new(
                &FIELDS[#index],
                |value: &#ident| &value.#member,
                |value: &mut #ident, deserializer| {
                    value.#member = _serde::Deserialize::deserialize(deserializer)?;
                    ::core::result::Result::Ok(())
                },
            )
        }
    });

    let nominations = container.interfaces.iter().map(|interface| {
        let name = interface_name(interface);
        quote! {
            morph_json::info::Nomination::of::<dyn #interface>(#name, |deserializer| {
                let value: #ident = _serde::Deserialize::deserialize(deserializer)?;
                ::core::result::Result::Ok(::std::boxed::Box::new(
                    ::std::boxed::Box::new(value) as ::std::boxed::Box<dyn #interface>,
                ) as ::std::boxed::Box<dyn ::core::any::Any>)
            })
        }
    });

    let auto_register = auto_register_submission(ident, container.auto_register);

    Ok(quote! {
        const _: () = {
            use morph_json::__macro_exports::serde_core as _serde;

            const FIELDS: &[morph_json::info::FieldInfo] = &[#(#field_infos),*];
            const INFO: morph_json::info::ShapeInfo =
                morph_json::info::ShapeInfo::new(#ident_str, FIELDS);
            const DEFS: &[morph_json::serde::FieldDef<#ident>] = &[#(#field_defs),*];
            const NOMINATIONS: &[morph_json::info::Nomination] = &[#(#nominations),*];

            impl morph_json::info::Shape for #ident {
                #[inline]
                fn shape_info() -> &'static morph_json::info::ShapeInfo {
                    &INFO
                }

                #[inline]
                fn nominations() -> &'static [morph_json::info::Nomination] {
                    NOMINATIONS
                }
            }

            impl morph_json::serde::Shaped for #ident {
                #[inline]
                fn field_defs() -> &'static [morph_json::serde::FieldDef<Self>] {
                    DEFS
                }
            }

            impl _serde::Serialize for #ident {
                fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
                where
                    S: _serde::Serializer,
                {
                    morph_json::serde::serialize_shaped(self, serializer)
                }
            }

            impl<'de> _serde::Deserialize<'de> for #ident {
                fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
                where
                    D: _serde::Deserializer<'de>,
                {
                    morph_json::serde::deserialize_shaped(deserializer)
                }
            }

            #auto_register
        };
    })
}

// -----------------------------------------------------------------------------
// Attribute parsing

fn parse_container_config(input: &DeriveInput) -> syn::Result<ContainerConfig> {
    let mut config = ContainerConfig {
        interfaces: Vec::new(),
        auto_register: false,
    };
    for attr in &input.attrs {
        if !attr.path().is_ident(SHAPE_ATTRIBUTE) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("implements") {
                meta.parse_nested_meta(|interface| {
                    config.interfaces.push(interface.path);
                    Ok(())
                })
            } else if meta.path.is_ident("auto_register") {
                config.auto_register = true;
                Ok(())
            } else {
                Err(meta.error("expected `implements(...)` or `auto_register`"))
            }
        })?;
    }
    Ok(config)
}

fn parse_field_configs(named: &syn::FieldsNamed) -> syn::Result<Vec<FieldConfig>> {
    let mut configs = Vec::with_capacity(named.named.len());
    for field in &named.named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let mut wire_name = ident.to_string();
        let mut sets = Vec::new();
        let mut skip = false;
        for attr in &field.attrs {
            if !attr.path().is_ident(SHAPE_ATTRIBUTE) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let name: LitStr = meta.value()?.parse()?;
                    wire_name = name.value();
                    Ok(())
                } else if meta.path.is_ident("sets") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    for set in content.parse_terminated(parse_lit_str, Token![,])? {
                        sets.push(set.value());
                    }
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    skip = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `rename = \"...\"`, `sets(...)` or `skip`"))
                }
            })?;
        }
        if !skip {
            configs.push(FieldConfig {
                ident,
                wire_name,
                sets,
            });
        }
    }
    Ok(configs)
}

fn parse_lit_str(input: syn::parse::ParseStream) -> syn::Result<LitStr> {
    input.parse()
}

fn interface_name(interface: &Path) -> String {
    interface
        .segments
        .last()
        .map(|segment| segment.ident.to_string())
        .unwrap_or_default()
}

// -----------------------------------------------------------------------------
// Auto registration

#[cfg(feature = "auto_register")]
fn auto_register_submission(ident: &Ident, requested: bool) -> TokenStream {
    if !requested {
        return TokenStream::new();
    }
    quote! {
        morph_json::__macro_exports::inventory::submit! {
            morph_json::catalog::CatalogEntry::of::<#ident>()
        }
    }
}

#[cfg(not(feature = "auto_register"))]
fn auto_register_submission(_ident: &Ident, _requested: bool) -> TokenStream {
    TokenStream::new()
}
