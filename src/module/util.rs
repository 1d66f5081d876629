macro_rules! impl_module {
    ($name:ident) => {
        pub struct $name {
            client: std::sync::Arc<$crate::client::Client>,
        }

        impl $name {
            pub fn new(client: std::sync::Arc<$crate::client::Client>) -> Self {
                Self { client }
            }

            pub fn client(&self) -> &std::sync::Arc<$crate::client::Client> {
                &self.client
            }
        }
    };
}

pub(super) use impl_module;
