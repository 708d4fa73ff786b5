use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject dependencies.
///
/// Every test gets a fresh Rocket instance over its own in-memory stores.
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`crate::store::MemoryStore`] and [`crate::store::MemorySecretStore`];
/// the stores are the same ones the client's Rocket instance uses.
///
/// `#[backend_test(seeded)]` additionally inserts the example elections,
/// each with a fresh keypair whose locked private half is in the secret store.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Seed the stores if asked.
    let maybe_seed = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "seeded" => quote! {
            crate::seed_example_elections(&store, &secrets).await;
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `seeded`")
                .into_compile_error()
                .into();
        }
        None => quote! {},
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                crate::store::MemoryStore,
                crate::store::MemorySecretStore,
            ) {
                log4rs_test_utils::test_logging::init_logging_once_for(
                    ["liquid_backend"],
                    None,
                    None,
                );

                let store = crate::store::MemoryStore::new();
                let secrets = crate::store::MemorySecretStore::new();

                #maybe_seed

                let rocket = crate::rocket_for_stores(
                    crate::test_figment(),
                    store.clone(),
                    secrets.clone(),
                );
                let rocket_client = rocket::local::asynchronous::Client::tracked(rocket)
                    .await
                    .unwrap();

                (rocket_client, store, secrets)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, store, secrets) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut seen = Vec::new();
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(type_ident) = type_path.path.segments.last().map(|s| &s.ident) {
                    let injected = if type_ident == "Client" {
                        Some(quote! { rocket_client })
                    } else if type_ident == "MemoryStore" {
                        Some(quote! { store.clone() })
                    } else if type_ident == "MemorySecretStore" {
                        Some(quote! { secrets.clone() })
                    } else {
                        None
                    };
                    if let Some(injected) = injected {
                        let type_name = type_ident.to_string();
                        if seen.contains(&type_name) {
                            return Err(syn::Error::new(
                                input.span(),
                                format!("Test cannot accept more than one `{type_name}`"),
                            ));
                        }
                        seen.push(type_name);
                        args.push(injected);
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `store_ident: MemoryStore` or `secrets_ident: MemorySecretStore`",
        ));
    }

    Ok(args)
}
