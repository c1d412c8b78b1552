use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn, LitInt, LitStr};

/// Time a function when the `perf_stats` feature is enabled.
///
/// The body is wrapped with a guard that logs the elapsed time on exit through
/// `tracing`. Without the feature the guard is never constructed and the
/// function compiles exactly as written.
///
/// # Parameters
/// - `threshold`: minimum duration in milliseconds before a line is logged
///   (default 1).
/// - `target`: subsystem tag printed in brackets (default `PERF`).
///
/// # Example
/// ```ignore
/// #[profile(threshold = 2, target = "PATHFINDING")]
/// pub fn find_path(&self, registry: &RegionRegistry, request: &PathRequest) -> NavResult<Route> {
///     // ... work ...
/// }
/// ```
#[proc_macro_attribute]
pub fn profile(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut threshold_ms: u128 = 1;
    let mut target = String::from("PERF");

    let attr_parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("threshold") {
            let lit: LitInt = meta.value()?.parse()?;
            threshold_ms = lit.base10_parse()?;
            Ok(())
        } else if meta.path.is_ident("target") {
            let lit: LitStr = meta.value()?.parse()?;
            target = lit.value();
            Ok(())
        } else {
            Err(meta.error("expected `threshold` or `target`"))
        }
    });
    parse_macro_input!(attr with attr_parser);

    let input = parse_macro_input!(item as ItemFn);
    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let fn_name_str = sig.ident.to_string();

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            #[cfg(feature = "perf_stats")]
            let _profile_timer = {
                struct ProfileGuard {
                    name: &'static str,
                    target: &'static str,
                    start: std::time::Instant,
                }
                impl Drop for ProfileGuard {
                    fn drop(&mut self) {
                        let elapsed = self.start.elapsed();
                        if elapsed.as_millis() >= #threshold_ms {
                            ::tracing::info!("[{}] {}: {:?}", self.target, self.name, elapsed);
                        }
                    }
                }
                ProfileGuard {
                    name: #fn_name_str,
                    target: #target,
                    start: std::time::Instant::now(),
                }
            };

            #block
        }
    };

    output.into()
}
