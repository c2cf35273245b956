//! Session wiring (spec §5 "Concurrency"): the real protocol uses three
//! distinct links — Generator→Sender, Sender→Receiver, and a local
//! Receiver→Generator control pipe for the redo set. `run_local_pair`
//! builds all three as loopback TCP connections and drives the three
//! roles on scoped threads, matching the source implementation's process
//! topology (Generator and Receiver co-located, Sender remote) without
//! needing three real processes.

use std::net::{TcpListener, TcpStream};
use std::path::Path;

use crate::basis::{FileBytesProvider, FsBasisProvider, FsSourceProvider};
use crate::channel::MessageChannel;
use crate::error::{CoreError, CoreResult};
use crate::generator::run_generator_session;
use crate::interfaces::{BackupHook, ExcludeOracle, FileList, PartialDirHook};
use crate::receiver::{run_receiver, Finalize};
use crate::session::SessionConfig;

fn loopback_pair() -> std::io::Result<(TcpStream, TcpStream)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let client = TcpStream::connect(addr)?;
    let (server, _) = listener.accept()?;
    Ok((server, client))
}

/// Runs a complete Generator/Sender/Receiver session against a source
/// root and a target root, both on the local filesystem. Returns the
/// finalize outcome of every file the Receiver processed.
pub fn run_local_pair(
    file_list: &dyn FileList,
    source_root: &Path,
    target_root: &Path,
    config: &SessionConfig,
    exclude: &dyn ExcludeOracle,
    backup: &dyn BackupHook,
    partial: &dyn PartialDirHook,
) -> CoreResult<Vec<(usize, Finalize)>> {
    let (gen_server, gen_client) = loopback_pair().map_err(CoreError::from)?;
    let (recv_server, recv_client) = loopback_pair().map_err(CoreError::from)?;
    let (ctrl_server, ctrl_client) = loopback_pair().map_err(CoreError::from)?;

    let source_provider = FsSourceProvider { source_root: source_root.to_path_buf() };
    let basis_provider = FsBasisProvider::from_config(target_root.to_path_buf(), config);

    std::thread::scope(|scope| -> CoreResult<Vec<(usize, Finalize)>> {
        let gen_handle = scope.spawn(|| -> CoreResult<()> {
            let mut to_sender = MessageChannel::new(gen_server);
            let mut from_receiver = MessageChannel::new(ctrl_server);
            run_generator_session(file_list, &basis_provider, config, &mut to_sender, &mut from_receiver)
        });

        let sender_handle = scope.spawn(|| -> CoreResult<()> {
            let mut from_generator = MessageChannel::new(gen_client);
            let mut to_receiver = MessageChannel::new(recv_server);
            crate::sender::run_sender(file_list, &source_provider, config, &mut from_generator, &mut to_receiver)
                .map(|_| ())
        });

        let recv_basis = FsBasisProvider::from_config(target_root.to_path_buf(), config);
        let mut from_sender = MessageChannel::new(recv_client);
        let mut to_generator = MessageChannel::new(ctrl_client);
        let results = run_receiver(
            file_list,
            target_root,
            &recv_basis,
            config,
            exclude,
            backup,
            partial,
            &mut from_sender,
            &mut to_generator,
        )?;

        gen_handle.join().expect("generator thread panicked")?;
        sender_handle.join().expect("sender thread panicked")?;
        Ok(results)
    })
}
