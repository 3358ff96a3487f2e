use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::{
    Attribute, Data, DeriveInput, Error, Fields, GenericArgument, LitStr, PathArguments, Result,
    Type,
};

use crate::naming::{namespace_path, pluralize, to_snake_case};

/// Property kind as understood by `persistent_model::PropertyKind`.
#[derive(Debug, Clone, PartialEq)]
enum Kind {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Object,
    List(Box<Kind>),
}

impl Kind {
    fn parse(s: &str) -> Option<Kind> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix("list<").and_then(|rest| rest.strip_suffix('>')) {
            return Kind::parse(inner).map(|k| Kind::List(Box::new(k)));
        }
        match s {
            "string" => Some(Kind::String),
            "integer" => Some(Kind::Integer),
            "float" => Some(Kind::Float),
            "boolean" => Some(Kind::Boolean),
            "timestamp" => Some(Kind::Timestamp),
            "object" => Some(Kind::Object),
            _ => None,
        }
    }
}

impl ToTokens for Kind {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let expanded = match self {
            Kind::String => quote! { ::persistent_model::PropertyKind::String },
            Kind::Integer => quote! { ::persistent_model::PropertyKind::Integer },
            Kind::Float => quote! { ::persistent_model::PropertyKind::Float },
            Kind::Boolean => quote! { ::persistent_model::PropertyKind::Boolean },
            Kind::Timestamp => quote! { ::persistent_model::PropertyKind::Timestamp },
            Kind::Object => quote! { ::persistent_model::PropertyKind::Object },
            Kind::List(inner) => quote! { ::persistent_model::PropertyKind::list(#inner) },
        };
        tokens.extend(expanded);
    }
}

#[derive(Default)]
struct StructAttrs {
    namespace: Option<String>,
    index: Option<String>,
    doc_type: Option<String>,
}

#[derive(Default)]
struct FieldAttrs {
    id: bool,
    default: bool,
    skip: bool,
    kind: Option<Kind>,
}

pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let attrs = parse_struct_attrs(&input.attrs)?;
    let type_name = to_snake_case(&name.to_string());
    let namespace = attrs.namespace.as_deref().map(namespace_path);

    let doc_type = attrs.doc_type.unwrap_or_else(|| match &namespace {
        Some(ns) => format!("{}/{}", ns, type_name),
        None => type_name.clone(),
    });
    let index = attrs.index.unwrap_or_else(|| match &namespace {
        Some(ns) => format!("{}_{}", ns.replace('/', "_"), pluralize(&type_name)),
        None => pluralize(&type_name),
    });

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new_spanned(
                    name,
                    "Document derive only supports structs with named fields",
                ))
            }
        },
        _ => return Err(Error::new_spanned(name, "Document derive only supports structs")),
    };

    let mut properties = Vec::new();
    let mut marked_id = None;
    let mut named_id = None;

    for field in fields {
        let ident = field.ident.as_ref().expect("named field");
        let field_attrs = parse_field_attrs(&field.attrs)?;
        let (serde_skip, serde_rename) = serde_options(&field.attrs)?;
        if field_attrs.skip || serde_skip {
            continue;
        }

        let property_name = serde_rename
            .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());

        if field_attrs.id {
            if marked_id.is_some() {
                return Err(Error::new_spanned(field, "only one field can be #[document(id)]"));
            }
            marked_id = Some(field);
        } else if ident == "id" {
            named_id = Some(field);
        }

        let (inferred, nullable) = infer(&field.ty);
        let kind = field_attrs.kind.unwrap_or(inferred);

        let mut property = quote! {
            ::persistent_model::Property::new(#property_name, #kind)
        };
        if nullable {
            property = quote! { #property.nullable() };
        }
        if field_attrs.default {
            let ty = &field.ty;
            property = quote! {
                #property.with_default(
                    ::persistent_model::__private::serde_json::to_value(
                        <#ty as ::core::default::Default>::default()
                    )
                    .unwrap_or(::persistent_model::__private::serde_json::Value::Null)
                )
            };
        }
        properties.push(property);
    }

    let id_field = marked_id.or(named_id).ok_or_else(|| {
        Error::new_spanned(
            name,
            "Document derive: no field marked with #[document(id)] and no field named `id`",
        )
    })?;
    if !is_option(&id_field.ty) {
        return Err(Error::new_spanned(
            &id_field.ty,
            "Document id field must be an Option<String>",
        ));
    }
    let id_ident = id_field.ident.as_ref().expect("named field");

    Ok(quote! {
        impl #impl_generics ::persistent_model::Document for #name #ty_generics #where_clause {
            const INDEX: &'static str = #index;
            const DOC_TYPE: &'static str = #doc_type;

            fn schema() -> ::persistent_model::Schema {
                ::persistent_model::Schema::new(Self::DOC_TYPE)
                    #(.property(#properties))*
            }

            fn id(&self) -> ::core::option::Option<&str> {
                self.#id_ident.as_deref()
            }

            fn set_id(&mut self, id: ::std::string::String) {
                self.#id_ident = ::core::option::Option::Some(id);
            }
        }
    })
}

fn parse_struct_attrs(attrs: &[Attribute]) -> Result<StructAttrs> {
    let mut parsed = StructAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("document")) {
        attr.parse_nested_meta(|meta| {
            let value = || -> Result<String> { Ok(meta.value()?.parse::<LitStr>()?.value()) };
            if meta.path.is_ident("namespace") {
                parsed.namespace = Some(value()?);
            } else if meta.path.is_ident("index") {
                parsed.index = Some(value()?);
            } else if meta.path.is_ident("doc_type") {
                parsed.doc_type = Some(value()?);
            } else {
                return Err(meta.error("expected `namespace`, `index` or `doc_type`"));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("document")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                parsed.id = true;
            } else if meta.path.is_ident("default") {
                parsed.default = true;
            } else if meta.path.is_ident("skip") {
                parsed.skip = true;
            } else if meta.path.is_ident("kind") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.kind = Some(
                    Kind::parse(&lit.value())
                        .ok_or_else(|| Error::new_spanned(&lit, "unknown property kind"))?,
                );
            } else {
                return Err(meta.error("expected `id`, `default`, `skip` or `kind`"));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

/// `skip` and `rename` from `#[serde(...)]`. Unrelated serde keys are ignored.
fn serde_options(attrs: &[Attribute]) -> Result<(bool, Option<String>)> {
    let mut skip = false;
    let mut rename = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
            } else if meta.path.is_ident("rename") && meta.input.peek(syn::token::Paren) {
                // rename(serialize = "..", deserialize = ".."): stored keys follow serialize
                meta.parse_nested_meta(|inner| {
                    let lit: LitStr = inner.value()?.parse()?;
                    if inner.path.is_ident("serialize") {
                        rename = Some(lit.value());
                    }
                    Ok(())
                })?;
            } else if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                rename = Some(lit.value());
            } else if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<syn::Expr>()?;
            } else if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                content.parse::<TokenStream>()?;
            }
            Ok(())
        })?;
    }
    Ok((skip, rename))
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}

fn first_type_arg(segment: &syn::PathSegment) -> Option<&Type> {
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        }),
        _ => None,
    }
}

fn is_option(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|s| s.ident == "Option")
}

/// Infer a property kind from a Rust type. The flag is true for `Option`.
fn infer(ty: &Type) -> (Kind, bool) {
    match ty {
        Type::Reference(reference) => infer(&reference.elem),
        Type::Array(array) => (Kind::List(Box::new(infer(&array.elem).0)), false),
        Type::Slice(slice) => (Kind::List(Box::new(infer(&slice.elem).0)), false),
        Type::Path(_) => {
            let Some(segment) = last_segment(ty) else {
                return (Kind::Object, false);
            };
            let inner = first_type_arg(segment).map(|t| infer(t).0);

            let kind = match segment.ident.to_string().as_str() {
                "Option" => return (inner.unwrap_or(Kind::Object), true),
                "Box" | "Rc" | "Arc" | "Cow" => inner.unwrap_or(Kind::Object),
                "Vec" | "VecDeque" | "HashSet" | "BTreeSet" => {
                    Kind::List(Box::new(inner.unwrap_or(Kind::Object)))
                }
                "String" | "str" | "char" => Kind::String,
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
                | "u128" | "usize" => Kind::Integer,
                "f32" | "f64" => Kind::Float,
                "bool" => Kind::Boolean,
                "DateTime" => Kind::Timestamp,
                _ => Kind::Object,
            };
            (kind, false)
        }
        _ => (Kind::Object, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(ty: &str) -> (Kind, bool) {
        infer(&syn::parse_str::<Type>(ty).unwrap())
    }

    #[test]
    fn infers_scalar_kinds() {
        assert_eq!(kind_of("String"), (Kind::String, false));
        assert_eq!(kind_of("u32"), (Kind::Integer, false));
        assert_eq!(kind_of("f64"), (Kind::Float, false));
        assert_eq!(kind_of("bool"), (Kind::Boolean, false));
        assert_eq!(kind_of("chrono::DateTime<Utc>"), (Kind::Timestamp, false));
        assert_eq!(kind_of("serde_json::Value"), (Kind::Object, false));
    }

    #[test]
    fn infers_wrappers() {
        assert_eq!(kind_of("Option<i64>"), (Kind::Integer, true));
        assert_eq!(
            kind_of("Vec<String>"),
            (Kind::List(Box::new(Kind::String)), false)
        );
        assert_eq!(
            kind_of("Option<Vec<DateTime<Utc>>>"),
            (Kind::List(Box::new(Kind::Timestamp)), true)
        );
    }

    #[test]
    fn parses_kind_overrides() {
        assert_eq!(Kind::parse("timestamp"), Some(Kind::Timestamp));
        assert_eq!(
            Kind::parse("list<integer>"),
            Some(Kind::List(Box::new(Kind::Integer)))
        );
        assert_eq!(Kind::parse("decimal"), None);
    }

    #[test]
    fn expands_names_for_namespaced_structs() {
        let input: DeriveInput = syn::parse_quote! {
            #[document(namespace = "MyNamespace")]
            struct PersistentArticleInNamespace {
                id: Option<String>,
                title: String,
            }
        };
        let expanded = expand(&input).unwrap().to_string();
        assert!(expanded.contains("\"my_namespace_persistent_article_in_namespaces\""));
        assert!(expanded.contains("\"my_namespace/persistent_article_in_namespace\""));
    }

    #[test]
    fn honors_serde_rename_after_other_options() {
        let input: DeriveInput = syn::parse_quote! {
            struct Article {
                id: Option<String>,
                #[serde(default, skip_serializing_if = "String::is_empty", rename = "headline")]
                title: String,
                #[serde(rename(serialize = "body_text", deserialize = "body"))]
                body: String,
            }
        };
        let expanded = expand(&input).unwrap().to_string();
        assert!(expanded.contains("\"headline\""));
        assert!(expanded.contains("\"body_text\""));
        assert!(!expanded.contains("\"title\""));
    }

    #[test]
    fn rejects_malformed_serde_attributes() {
        let input: DeriveInput = syn::parse_quote! {
            struct Article {
                id: Option<String>,
                #[serde(rename = 42)]
                title: String,
            }
        };
        assert!(expand(&input).is_err());
    }

    #[test]
    fn rejects_non_option_id() {
        let input: DeriveInput = syn::parse_quote! {
            struct Article {
                id: String,
            }
        };
        assert!(expand(&input).is_err());
    }
}
