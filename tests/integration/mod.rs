pub mod provider_http;
