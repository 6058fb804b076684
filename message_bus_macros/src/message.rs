use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, LitStr};

pub enum MessageVariant {
    Command,
    Event,
    CommandResponse,
}

pub fn derive_message(input: TokenStream, variant: MessageVariant) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (header_field, custom_name) = match parse_struct_attrs(&input) {
        Ok(attrs) => attrs,
        Err(err) => return err.to_compile_error().into(),
    };
    let header_field = header_field.unwrap_or_else(|| "header".to_string());

    if let Err(err) = check_header_field(&input, &header_field) {
        return err.to_compile_error().into();
    }

    let header_ident = format_ident!("{}", header_field);
    let message_name = custom_name.unwrap_or_else(|| name.to_string());

    let (kind, marker) = match variant {
        MessageVariant::Command => (
            quote! { message_bus::MessageKind::Command },
            quote! { message_bus::Command },
        ),
        MessageVariant::Event => (
            quote! { message_bus::MessageKind::Event },
            quote! { message_bus::Event },
        ),
        MessageVariant::CommandResponse => (
            quote! { message_bus::MessageKind::CommandResponse },
            quote! { message_bus::CommandResponse },
        ),
    };

    let expanded = quote! {
        impl #impl_generics message_bus::Named for #name #ty_generics #where_clause {
            const NAME: &'static str = #message_name;
        }

        impl #impl_generics message_bus::Message for #name #ty_generics #where_clause {
            fn header(&self) -> &message_bus::Header {
                &self.#header_ident
            }

            fn kind(&self) -> message_bus::MessageKind {
                #kind
            }

            fn message_name(&self) -> &'static str {
                #message_name
            }
        }

        impl #impl_generics #marker for #name #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}

fn parse_struct_attrs(input: &DeriveInput) -> syn::Result<(Option<String>, Option<String>)> {
    let mut header_field = None;
    let mut custom_name = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("message") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("header") {
                let value: LitStr = meta.value()?.parse()?;
                header_field = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                custom_name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `header = \"...\"` or `name = \"...\"`"))
            }
        })?;
    }

    Ok((header_field, custom_name))
}

fn check_header_field(input: &DeriveInput, header_field: &str) -> syn::Result<()> {
    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "message derives only support structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "message derives only support structs",
            ))
        }
    };

    let found = fields
        .iter()
        .filter_map(|field| field.ident.as_ref())
        .any(|ident| ident == header_field);

    if found {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &input.ident,
            format!(
                "no field named `{}`; add a `Header` field or set #[message(header = \"...\")]",
                header_field
            ),
        ))
    }
}
