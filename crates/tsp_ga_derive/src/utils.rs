use quote::quote;
use syn::{Attribute, Expr, ExprLit, Lit, Meta, Type, TypePath};

/// `choice` fields are `CliValue` enums and parse through their generated `parse`.
pub fn build_cli_parse_expr(ty: &Type, choice: bool) -> proc_macro2::TokenStream {
    if choice {
        quote! { <#ty>::parse(&raw)? }
    } else {
        quote! {
            raw.parse::<#ty>()
                .map_err(|e| crate::Error::invalid_input(format!(
                    "Invalid value for --{name}: {raw} ({e})"
                )))?
        }
    }
}

/// `<a|b|c>` over the canonical spellings of a `CliValue` enum.
pub fn choice_placeholder(values: &[String]) -> String {
    format!("<{}>", values.join("|"))
}

/// Joins the `///` lines on a field into one trimmed sentence.
pub fn doc_string(attrs: &[Attribute]) -> String {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let Meta::NameValue(nv) = &attr.meta
            && let Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) = &nv.value
        {
            let line = s.value();
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
    }
    lines.join(" ")
}

/// Usage placeholder for a field type, e.g. `usize` becomes `<usize>`.
pub fn type_placeholder(ty: &Type) -> String {
    if let Type::Path(TypePath { path, .. }) = ty
        && let Some(seg) = path.segments.last()
    {
        return format!("<{}>", to_kebab_case(&seg.ident.to_string()));
    }
    String::from("<value>")
}

pub fn to_kebab_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (idx, ch) in s.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if idx != 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
