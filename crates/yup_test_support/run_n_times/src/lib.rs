use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn, LitInt};

/// Runs the annotated function's body `N` times in a row.
///
/// ```ignore
/// #[tokio::test]
/// #[n_times(100)]
/// async fn racy_thing_is_stable() { /* ... */ }
/// ```
///
/// Composes with `#[tokio::test]` placed above it: the runtime is built once per iteration.
#[proc_macro_attribute]
pub fn n_times(args: TokenStream, item: TokenStream) -> TokenStream {
    let n = parse_macro_input!(args as LitInt);
    let mut fun = parse_macro_input!(item as ItemFn);

    let n: usize = match n.base10_parse() {
        Ok(n) if n > 0 => n,
        Ok(_) => {
            return syn::Error::new(n.span(), "N must be at least 1")
                .to_compile_error()
                .into()
        }
        Err(e) => return e.to_compile_error().into(),
    };

    let body = &fun.block;
    let repeated: proc_macro2::TokenStream = quote! {
        {
            for _ in 0..#n {
                #body
            }
        }
    };
    fun.block = match syn::parse2(repeated) {
        Ok(block) => Box::new(block),
        Err(e) => return e.to_compile_error().into(),
    };

    quote!(#fun).into()
}
