use proc_macro2::Span;
use syn::{
    parse::Parser, punctuated::Punctuated, spanned::Spanned, Attribute, Expr, ExprLit, Fields,
    ItemStruct, Lit, LitStr, MetaNameValue, Token,
};

#[derive(Default)]
pub struct CompletionSchemaArgs {
    pub name: Option<LitStr>,
    pub description: Option<LitStr>,
}

/// Parse `name = "..."` / `description = "..."` pairs from the attribute.
pub fn parse_completion_schema_args(
    attr: proc_macro::TokenStream,
) -> syn::Result<CompletionSchemaArgs> {
    let mut result = CompletionSchemaArgs::default();
    if attr.is_empty() {
        return Ok(result);
    }

    let pairs = Punctuated::<MetaNameValue, Token![,]>::parse_terminated.parse(attr)?;

    for pair in pairs {
        let Some(key) = pair.path.get_ident() else {
            return Err(syn::Error::new_spanned(&pair.path, "expected identifier"));
        };

        let value = match &pair.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(lit), ..
            }) => lit.clone(),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "expected a string literal",
                ))
            }
        };

        let slot = match key.to_string().as_str() {
            "name" => &mut result.name,
            "description" => &mut result.description,
            other => {
                return Err(syn::Error::new(
                    key.span(),
                    format!("unsupported argument `{other}`"),
                ))
            }
        };

        if slot.is_some() {
            return Err(syn::Error::new(
                key.span(),
                format!("duplicate `{key}` argument"),
            ));
        }
        *slot = Some(value);
    }

    Ok(result)
}

pub fn ensure_named_struct(item: &ItemStruct) -> syn::Result<()> {
    if matches!(item.fields, Fields::Named(_)) {
        return Ok(());
    }
    Err(syn::Error::new(
        item.struct_token.span(),
        "`#[completion_schema]` needs a struct with named fields",
    ))
}

pub fn collect_doc_comments(attrs: &[Attribute]) -> Option<String> {
    let docs: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(MetaNameValue {
                value:
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(lit), ..
                    }),
                ..
            }) => Some(lit.value().trim().to_string()),
            _ => None,
        })
        .collect();

    if docs.is_empty() {
        None
    } else {
        Some(docs.join("\n"))
    }
}

pub fn collect_field_docs(item: &ItemStruct) -> Vec<(String, String)> {
    let Fields::Named(fields) = &item.fields else {
        return Vec::new();
    };

    fields
        .named
        .iter()
        .filter_map(|field| {
            let ident = field.ident.as_ref()?;
            let doc = collect_doc_comments(&field.attrs)?;
            Some((ident.to_string(), doc))
        })
        .collect()
}

pub fn infer_schema_name(item: &ItemStruct, explicit: Option<&LitStr>) -> LitStr {
    explicit
        .cloned()
        .unwrap_or_else(|| LitStr::new(&item.ident.to_string(), Span::call_site()))
}

pub fn infer_description(explicit: Option<&LitStr>, doc: Option<String>) -> Option<LitStr> {
    explicit
        .cloned()
        .or_else(|| doc.map(|text| LitStr::new(&text, Span::call_site())))
}
