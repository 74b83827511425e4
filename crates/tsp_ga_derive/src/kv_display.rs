use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input, spanned::Spanned};

/// Renders a struct as aligned `key = value` lines for startup logging.
///
/// `#[kv(name = "...")]` renames a key, `#[kv(fmt = "...")]` picks one of
/// `display`, `debug`, `len`, `path`, `or_dash`, and `#[kv(skip)]` hides a field.
pub fn derive_kv_display_inner(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let struct_ident = input.ident.clone();

    let Data::Struct(data_struct) = &input.data else {
        return syn::Error::new(input.span(), "KvDisplay can only be derived for structs")
            .to_compile_error()
            .into();
    };

    let Fields::Named(fields) = &data_struct.fields else {
        return syn::Error::new(input.span(), "KvDisplay requires named fields")
            .to_compile_error()
            .into();
    };

    let mut keys: Vec<String> = Vec::new();
    let mut vals = Vec::new();

    for field in &fields.named {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let mut key = field_ident.to_string();
        let mut fmt_mode = String::from("display");
        let mut skip = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("kv") {
                continue;
            }
            let parse_result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    key = lit.value();
                    return Ok(());
                }
                if meta.path.is_ident("fmt") {
                    let lit: LitStr = meta.value()?.parse()?;
                    fmt_mode = lit.value();
                    return Ok(());
                }
                if meta.path.is_ident("skip") {
                    skip = true;
                    return Ok(());
                }
                Err(meta.error("unsupported kv attribute; expected name/fmt/skip"))
            });
            if let Err(err) = parse_result {
                return err.to_compile_error().into();
            }
        }

        if skip {
            continue;
        }

        let value = match fmt_mode.as_str() {
            "display" => quote! { format!("{}", &self.#field_ident) },
            "debug" => quote! { format!("{:?}", &self.#field_ident) },
            "len" => quote! { format!("{}", self.#field_ident.len()) },
            "path" => quote! { format!("{}", self.#field_ident.display()) },
            "or_dash" => quote! {
                if self.#field_ident.trim().is_empty() {
                    String::from("-")
                } else {
                    format!("{}", &self.#field_ident)
                }
            },
            other => {
                return syn::Error::new(field.span(), format!("unsupported kv fmt mode: {other}"))
                    .to_compile_error()
                    .into();
            }
        };
        keys.push(key);
        vals.push(value);
    }

    let width = keys.iter().map(String::len).max().unwrap_or(0);
    let padded: Vec<LitStr> = keys
        .iter()
        .map(|key| LitStr::new(&format!("{key:<width$}"), Span::call_site()))
        .collect();

    let expanded = quote! {
        impl std::fmt::Display for #struct_ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                #(
                    write!(f, "\n\t{} = {}", #padded, #vals)?;
                )*
                Ok(())
            }
        }
    };

    TokenStream::from(expanded)
}
