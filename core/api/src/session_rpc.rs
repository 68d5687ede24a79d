// dryrun/core/api/src/session_rpc.rs

use crate::methods::SessionApi;
use crate::metrics::rpc_request;
use crate::types::{ApiError, ParamList};
use dryrun_execution::SessionExecutor;
use jsonrpc_core::{IoHandler, Params, Value};
use std::sync::Arc;

type Handler = fn(&SessionApi, &ParamList) -> Result<Value, ApiError>;

/// Methods taking positional params, in registration order
const SESSION_METHODS: &[(&str, Handler)] = &[
    ("deletesessions", SessionApi::delete_sessions),
    ("invokefunctionwithsession", SessionApi::invoke_function),
    ("invokescriptwithsession", SessionApi::invoke_script),
    ("virtualdeploy", SessionApi::virtual_deploy),
    ("putstoragewithsession", SessionApi::put_storage),
    ("getstoragewithsession", SessionApi::get_storage),
    ("findstoragewithsession", SessionApi::find_storage),
    ("setneobalance", SessionApi::set_neo_balance),
    ("setgasbalance", SessionApi::set_gas_balance),
    ("setnep17balance", SessionApi::set_nep17_balance),
    ("setsessiontimestamp", SessionApi::set_timestamp),
    ("getsessiontimestamp", SessionApi::get_timestamps),
];

/// Add the session sandbox methods to the IoHandler
pub fn register_session_methods(io_handler: &mut IoHandler, executor: Arc<SessionExecutor>) {
    let api = Arc::new(SessionApi::new(executor));

    // listsessions ignores its params
    let api_list = api.clone();
    io_handler.add_sync_method("listsessions", move |_params: Params| {
        rpc_request("listsessions");
        Ok(api_list.list_sessions())
    });

    for &(name, handler) in SESSION_METHODS {
        let api = api.clone();
        io_handler.add_sync_method(name, move |params: Params| {
            rpc_request(name);
            let params = ParamList::parse(params)?;
            handler(&api, &params).map_err(Into::into)
        });
    }
}
