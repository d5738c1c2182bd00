use proc_macro2::TokenStream;
use quote::quote;
use syn::{ItemTrait, parse_quote};

pub fn expand(mut item: ItemTrait) -> syn::Result<TokenStream> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new(
            item.ident.span(),
            "`#[resolvable]` cannot be applied to generic traits",
        ));
    }

    let ident = &item.ident;
    let name = ident.to_string();

    // The supertrait makes every implementer serializable through the
    // trait object and enables the upcast inside `serialize_interface`.
    item.supertraits
        .push(parse_quote!(morph_json::serde::Resolved));

    Ok(quote! {
        #item

        impl morph_json::__macro_exports::serde_core::Serialize for dyn #ident {
            fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
            where
                S: morph_json::__macro_exports::serde_core::Serializer,
            {
                morph_json::serde::serialize_interface(self, serializer)
            }
        }

        impl<'de> morph_json::__macro_exports::serde_core::Deserialize<'de>
            for ::std::boxed::Box<dyn #ident>
        {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: morph_json::__macro_exports::serde_core::Deserializer<'de>,
            {
                morph_json::serde::deserialize_interface::<Self, D>(
                    ::core::any::TypeId::of::<dyn #ident>(),
                    #name,
                    deserializer,
                )
            }
        }
    })
}
