use darling::Error;
use darling::ast::NestedMeta;
use quote::quote;
use syn::{Data, DeriveInput, Fields, ItemStruct, parse_macro_input};

use proc_macro::TokenStream;

/// Serializes every field in declaration order, little-endian.
#[proc_macro_derive(ToBytes)]
pub fn derive_to_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields: Vec<syn::Member> = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(nf) => nf
                .named
                .iter()
                .filter_map(|f| f.ident.clone())
                .map(syn::Member::from)
                .collect(),
            Fields::Unnamed(uf) => (0..uf.unnamed.len())
                .map(|i| syn::Index::from(i).into())
                .collect(),
            Fields::Unit => Vec::new(),
        },
        _ => {
            return syn::Error::new_spanned(name, "ToBytes can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let expanded = quote! {
        impl crate::byteorder::WriteBytesLe for #name {
            fn write_le(&self, dst: &mut Vec<u8>) {
                #( crate::byteorder::WriteBytesLe::write_le(&self.#fields, dst); )*
            }
        }
    };

    TokenStream::from(expanded)
}

/// Implements `RiffChunk` with the given four-byte tag, e.g.
/// `#[riff_chunk(b"fmt ")]`. The struct must also derive `ToBytes`.
#[proc_macro_attribute]
pub fn riff_chunk(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(v) => v,
        Err(e) => return TokenStream::from(Error::from(e).write_errors()),
    };

    let tag = match args.as_slice() {
        [NestedMeta::Lit(syn::Lit::ByteStr(bs))] => bs,
        _ => {
            return TokenStream::from(
                Error::custom("riff_chunk expects a single byte string, e.g. b\"fmt \"")
                    .write_errors(),
            );
        }
    };

    let tag_bytes = tag.value();
    if tag_bytes.len() != 4 {
        return TokenStream::from(
            syn::Error::new_spanned(tag, "riff_chunk tags are 4 bytes").to_compile_error(),
        );
    }

    let input = parse_macro_input!(item as ItemStruct);
    let name = &input.ident;

    let expanded = quote! {
        #input

        impl crate::wav::RiffChunk for #name {
            const TAG: [u8; 4] = [#(#tag_bytes),*];

            fn payload(&self) -> Vec<u8> {
                let mut payload = Vec::new();
                crate::byteorder::WriteBytesLe::write_le(self, &mut payload);
                payload
            }
        }
    };

    TokenStream::from(expanded)
}
