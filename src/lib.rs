pub mod shared {
    pub mod infrastructure {
        pub mod event_bus;
        pub mod intent_outbox;
    }
}

pub mod modules {
    pub mod payments {
        pub mod core {
            pub mod errors;
            pub mod events;
            pub mod integration_events;
            pub mod payment;
            pub mod state;
        }
        pub mod use_cases {
            pub mod dispatch;
            pub mod errors;
            pub mod create_payment {
                pub mod command;
                pub mod handler;
                pub mod inbound {
                    pub mod broker;
                    pub mod graphql;
                    pub mod http;
                }
            }
            pub mod complete_payment {
                pub mod command;
                pub mod handler;
            }
            pub mod get_payment {
                pub mod handler;
                pub mod inbound {
                    pub mod graphql;
                    pub mod http;
                }
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod intent_outbox;
                pub mod payment_processor;
                pub mod payment_processor_in_memory;
                pub mod payment_store;
                pub mod payment_store_in_memory;
                pub mod stripe;
            }
        }
    }
}

pub mod shell;
