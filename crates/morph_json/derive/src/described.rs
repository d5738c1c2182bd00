use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr};

use crate::SHAPE_ATTRIBUTE;

struct VariantConfig {
    ident: Ident,
    name: String,
    description: String,
}

pub fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new(
            input.ident.span(),
            "`Described` can only be derived for enums",
        ));
    };

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.ident.span(),
                "`Described` requires unit variants",
            ));
        }
        let name = variant.ident.to_string();
        // The variant name doubles as the description when none is given.
        let mut description = name.clone();
        for attr in &variant.attrs {
            if !attr.path().is_ident(SHAPE_ATTRIBUTE) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("description") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let text: LitStr = content.parse()?;
                    description = text.value();
                    Ok(())
                } else {
                    Err(meta.error("expected `description(\"...\")`"))
                }
            })?;
        }
        variants.push(VariantConfig {
            ident: variant.ident.clone(),
            name,
            description,
        });
    }

    let ident = &input.ident;
    let ident_str = ident.to_string();

    let description_arms = variants.iter().map(|variant| {
        let v = &variant.ident;
        let text = &variant.description;
        quote! { #ident::#v => #text, }
    });
    let name_arms = variants.iter().map(|variant| {
        let v = &variant.ident;
        let text = &variant.name;
        quote! { #ident::#v => #text, }
    });
    let description_probes = variants.iter().map(|variant| {
        let v = &variant.ident;
        let text = &variant.description;
        quote! {
            if morph_json::convert::text_matches(#text, text) {
                return ::core::option::Option::Some(#ident::#v);
            }
        }
    });
    let name_probes = variants.iter().map(|variant| {
        let v = &variant.ident;
        let text = &variant.name;
        quote! {
            if morph_json::convert::text_matches(#text, text) {
                return ::core::option::Option::Some(#ident::#v);
            }
        }
    });

    Ok(quote! {
        const _: () = {
            use morph_json::__macro_exports::serde_core as _serde;

            impl morph_json::convert::Described for #ident {
                fn description(&self) -> &'static str {
                    match self {
                        #(#description_arms)*
                    }
                }

                fn variant_name(&self) -> &'static str {
                    match self {
                        #(#name_arms)*
                    }
                }

                fn from_text(text: &str) -> ::core::option::Option<Self> {
                    #(#description_probes)*
                    #(#name_probes)*
                    ::core::option::Option::None
                }
            }

            impl ::core::fmt::Display for #ident {
                fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                    f.write_str(morph_json::convert::Described::description(self))
                }
            }

            impl ::core::str::FromStr for #ident {
                type Err = morph_json::convert::UnknownDescription;

                fn from_str(text: &str) -> ::core::result::Result<Self, Self::Err> {
                    <#ident as morph_json::convert::Described>::from_text(text).ok_or_else(
                        || morph_json::convert::UnknownDescription::new(#ident_str, text),
                    )
                }
            }

            impl _serde::Serialize for #ident {
                fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
                where
                    S: _serde::Serializer,
                {
                    serializer.serialize_str(morph_json::convert::Described::description(self))
                }
            }

            impl<'de> _serde::Deserialize<'de> for #ident {
                fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
                where
                    D: _serde::Deserializer<'de>,
                {
                    struct DescribedVisitor;

                    impl _serde::de::Visitor<'_> for DescribedVisitor {
                        type Value = #ident;

                        fn expecting(
                            &self,
                            formatter: &mut ::core::fmt::Formatter<'_>,
                        ) -> ::core::fmt::Result {
                            formatter
                                .write_str(concat!("a description or variant name of `", #ident_str, "`"))
                        }

                        fn visit_str<E>(self, text: &str) -> ::core::result::Result<#ident, E>
                        where
                            E: _serde::de::Error,
                        {
                            <#ident as morph_json::convert::Described>::from_text(text).ok_or_else(
                                || {
                                    E::custom(morph_json::convert::UnknownDescription::new(
                                        #ident_str, text,
                                    ))
                                },
                            )
                        }
                    }

                    deserializer.deserialize_str(DescribedVisitor)
                }
            }
        };
    })
}
