mod document;
mod naming;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Document)] derive macro
// ============================================================================

/// Derive macro for the `Document` trait.
///
/// Generates the index name, type name, id accessors, and a schema whose
/// property kinds are inferred from the field types.
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, Document)]
/// #[document(namespace = "my_namespace")]
/// struct PersistentArticleInNamespace {
///     id: Option<String>,
///     title: String,
///     #[document(kind = "timestamp")]
///     published_on: Option<String>,
///     #[document(default)]
///     tags: Vec<String>,
/// }
/// // INDEX    = "my_namespace_persistent_article_in_namespaces"
/// // DOC_TYPE = "my_namespace/persistent_article_in_namespace"
/// ```
///
/// Struct attributes: `namespace`, `index`, `doc_type`.
/// Field attributes: `id`, `default`, `kind = "..."`, `skip`.
///
/// The id field defaults to the field named `id` and must be an `Option`.
#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    document::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
