use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input, spanned::Spanned};

use crate::utils;

/// Generates `split_arg`, `apply_cli_option` and `cli_usage` for a named-field struct.
///
/// Fields opt in with `#[cli(long = "...")]`. `choice` marks a `CliValue` enum
/// field, parsed by the enum and shown with its own `<a|b>` placeholder.
/// `value = "<...>"` overrides the usage placeholder and `flag` turns a `bool`
/// field into `--name[=<bool>]` plus `--no-name`.
pub fn derive_cli_options_inner(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let struct_ident = input.ident.clone();

    let Data::Struct(data_struct) = &input.data else {
        return syn::Error::new(input.span(), "CliOptions can only be derived for structs")
            .to_compile_error()
            .into();
    };

    let Fields::Named(fields) = &data_struct.fields else {
        return syn::Error::new(input.span(), "CliOptions requires named fields")
            .to_compile_error()
            .into();
    };

    let mut arms = Vec::new();
    let mut usage_keys = Vec::new();
    let mut usage_helps = Vec::new();

    for field in &fields.named {
        let Some(field_ident) = &field.ident else {
            continue;
        };

        let mut long_name: Option<String> = None;
        let mut is_choice = false;
        let mut placeholder: Option<String> = None;
        let mut is_flag = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("cli") {
                continue;
            }
            let parse_result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("long") {
                    let lit: LitStr = meta.value()?.parse()?;
                    long_name = Some(lit.value());
                    return Ok(());
                }
                if meta.path.is_ident("choice") {
                    is_choice = true;
                    return Ok(());
                }
                if meta.path.is_ident("value") {
                    let lit: LitStr = meta.value()?.parse()?;
                    placeholder = Some(lit.value());
                    return Ok(());
                }
                if meta.path.is_ident("flag") {
                    is_flag = true;
                    return Ok(());
                }
                Err(meta.error("unsupported cli attribute; expected long/choice/value/flag"))
            });
            if let Err(err) = parse_result {
                return err.to_compile_error().into();
            }
        }

        let Some(long_name) = long_name else {
            continue;
        };
        let help = utils::doc_string(&field.attrs);
        let long_name_lit = LitStr::new(&long_name, Span::call_site());

        if is_flag {
            let negated = format!("no-{long_name}");
            let negated_lit = LitStr::new(&negated, Span::call_site());
            arms.push(quote! {
                #long_name_lit => {
                    self.#field_ident = match value {
                        Some(raw) => Self::parse_cli_bool(name, &raw)?,
                        None => true,
                    };
                    Ok(true)
                }
            });
            arms.push(quote! {
                #negated_lit => {
                    if value.is_some() {
                        return Err(crate::Error::invalid_input(format!(
                            "Flag --{name} does not take a value"
                        )));
                    }
                    self.#field_ident = false;
                    Ok(true)
                }
            });
            let key = format!("--{long_name}[=<bool>]");
            usage_keys.push(quote! { String::from(#key) });
            usage_helps.push(help);
            let negated_key = format!("--{negated}");
            usage_keys.push(quote! { String::from(#negated_key) });
            usage_helps.push(String::new());
            continue;
        }

        let ty = &field.ty;
        let parse_expr = utils::build_cli_parse_expr(ty, is_choice);
        arms.push(quote! {
            #long_name_lit => {
                let raw = value.ok_or_else(|| {
                    crate::Error::invalid_input(format!("Missing value for --{name}"))
                })?;
                self.#field_ident = #parse_expr;
                Ok(true)
            }
        });
        let key = match placeholder {
            Some(placeholder) => {
                let key = format!("--{long_name} {placeholder}");
                quote! { String::from(#key) }
            }
            None if is_choice => {
                let prefix = format!("--{long_name} ");
                quote! { format!("{}{}", #prefix, <#ty>::PLACEHOLDER) }
            }
            None => {
                let key = format!("--{long_name} {}", utils::type_placeholder(ty));
                quote! { String::from(#key) }
            }
        };
        usage_keys.push(key);
        usage_helps.push(help);
    }

    let expanded = quote! {
        impl #struct_ident {
            fn split_arg(
                raw_name: &str,
                args: &mut std::iter::Peekable<impl Iterator<Item = String>>,
            ) -> (String, Option<String>) {
                if let Some((k, v)) = raw_name.split_once('=') {
                    return (k.to_string(), Some(v.to_string()));
                }

                let value = match args.peek() {
                    Some(next) if !next.starts_with("--") => args.next(),
                    _ => None,
                };

                (raw_name.to_string(), value)
            }

            fn apply_cli_option(
                &mut self,
                name: &str,
                value: Option<String>,
            ) -> crate::Result<bool> {
                match name {
                    #(#arms,)*
                    _ => Ok(false),
                }
            }

            #[allow(dead_code)]
            fn parse_cli_bool(name: &str, raw: &str) -> crate::Result<bool> {
                match raw.to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => Ok(true),
                    "0" | "false" | "no" | "off" => Ok(false),
                    _ => Err(crate::Error::invalid_input(format!(
                        "Invalid boolean for --{name}: {raw} (expected true/false)"
                    ))),
                }
            }

            /// One line per option, generated from the field docs.
            pub fn cli_usage() -> String {
                let rows: Vec<(String, &str)> = vec![#((#usage_keys, #usage_helps)),*];
                let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
                rows.iter()
                    .map(|(key, help)| {
                        if help.is_empty() {
                            format!("  {key}\n")
                        } else {
                            format!("  {key:<width$}  {help}\n")
                        }
                    })
                    .collect()
            }
        }
    };

    TokenStream::from(expanded)
}
