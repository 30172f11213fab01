//! Small proc-macros that inline the request-scoped boilerplate every
//! method [`Handler`](../trellis_ldp/handlers/index.html) needs: pulling the
//! resolved [`Session`] out of the request context and bailing out early
//! with the right [`LdpError`] when WebAC denies the operation.
//!
//! These exist for the same reason `check_api_auth!` exists in the web
//! layer this crate grew out of - the guard clause is identical at every
//! call site, differs only in which [`Permission`] is required, and reads
//! better inlined than hidden behind an extra async fn hop.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Expr, Token};

struct RequirePermissionInput {
    ctx: Expr,
    permission: Expr,
}

impl syn::parse::Parse for RequirePermissionInput {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let ctx: Expr = input.parse()?;
        input.parse::<Token![,]>()?;
        let permission: Expr = input.parse()?;
        Ok(Self { ctx, permission })
    }
}

/// `require_permission!(ctx, Permission::Write)` expands to a guard clause
/// that calls `ctx.authorize(permission)` and returns the resulting
/// [`LdpError`] (wrapped in `Err(...)`) from the enclosing function when
/// authorization fails. The enclosing function must return a `Result`
/// whose error type is `crate::error::LdpError`.
#[proc_macro]
pub fn require_permission(input: TokenStream) -> TokenStream {
    let RequirePermissionInput { ctx, permission } = parse_macro_input!(input as RequirePermissionInput);
    let expanded: TokenStream2 = quote! {
        if let Err(__deny) = (#ctx).authorize(#permission).await {
            return Err(__deny);
        }
    };
    expanded.into()
}
