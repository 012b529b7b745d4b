mod alert;
mod trust_bundle;
