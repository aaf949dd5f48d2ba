use api::{HostedClient, ProviderConfig};
use dioxus::prelude::*;

use ui::{AuthProvider, ToastProvider, ToastStack};
use views::{Home, Login};

mod views;

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[route("/")]
    Home {},
    #[route("/login")]
    Login {},
}

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    dioxus::logger::initialize_default();

    let config = match ProviderConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "auth provider is not configured; not starting");
            #[cfg(not(target_arch = "wasm32"))]
            std::process::exit(1);
            #[cfg(target_arch = "wasm32")]
            return;
        }
    };

    dioxus::LaunchBuilder::new()
        .with_context(HostedClient::new(config))
        .launch(App);
}

#[component]
fn App() -> Element {
    let client = use_context::<HostedClient>();

    #[cfg(debug_assertions)]
    {
        let diagnostics_client = client.clone();
        use_hook(|| std::rc::Rc::new(api::diagnostics::log_auth_events(&diagnostics_client)));
        use_future(move || {
            let client = diagnostics_client.clone();
            async move {
                api::diagnostics::test_connection(&client).await;
            }
        });
    }

    rsx! {
        // Global app resources
        document::Link { rel: "stylesheet", href: MAIN_CSS }

        ToastProvider {
            AuthProvider {
                client: client,
                Router::<Route> {}
            }
            ToastStack {}
        }
    }
}
