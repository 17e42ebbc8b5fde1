mod common;
mod ledger;
mod routing;
