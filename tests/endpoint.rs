//! Behavior tests for the pipe endpoint lifecycle and overlapped I/O.
#![cfg(windows)]

#[macro_use]
mod util;
use util::{testinit, NameGen, TestResult};

use color_eyre::eyre::{bail, ensure, eyre, Report};
use overlapped_pipe::{
    os::windows::{AsyncRequest, EndpointOptions, PipeEndpoint},
    Outcome, PipeMode,
};
use std::{io, os::windows::io::AsHandle, thread, time::Duration};

fn oerr(o: Outcome) -> Report { eyre!("unexpected failure outcome: {o:?}") }

/// Creates a unique-instance message-mode endpoint under a fresh name.
fn create_unique(id: &'static str) -> TestResult<(String, PipeEndpoint)> {
    for nm in NameGen::new(id).take(16) {
        match EndpointOptions::new(nm.clone()).unique(true).create_only() {
            Ok(ep) => return Ok((nm, ep)),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => continue,
            Err(e) => return Err(e.into()),
        }
    }
    bail!("no free pipe name found")
}

/// Spins until the endpoint has buffered data, so that peeking and short reads are
/// deterministic.
fn await_data(ep: &PipeEndpoint) -> TestResult<usize> {
    for _ in 0..200 {
        let n = ep.total_available().map_err(oerr)?;
        if n > 0 {
            return Ok(n);
        }
        thread::sleep(Duration::from_millis(5));
    }
    bail!("no data arrived within the deadline")
}

#[test]
fn unique_instance_conflict_and_fallback() -> TestResult {
    testinit();
    let (name, _first) = create_unique(make_id!())?;

    let second = EndpointOptions::new(name.clone()).unique(true).create_only();
    ensure!(second.is_err(), "creating a second unique instance must fail");

    // Same inputs, but with the race-safe fallback: ends up opening the existing instance.
    let fallback = EndpointOptions::new(name).unique(true).create_or_open()?;
    ensure!(!fallback.is_unique(), "an opened endpoint cannot claim uniqueness");
    Ok(())
}

#[test]
fn invalid_params_fail_before_any_os_call() -> TestResult {
    testinit();
    let cases = [
        EndpointOptions::new("x").instance_limit(0u32).create_only(),
        EndpointOptions::new("x").instance_limit(256u32).create_only(),
        EndpointOptions::new("x").instance_limit(0u32).create_or_open(),
        EndpointOptions::new("").create_only(),
        PipeEndpoint::open_only("", PipeMode::Bytes),
    ];
    for c in cases {
        let e = c.err().ok_or_else(|| eyre!("invalid parameters were accepted"))?;
        ensure!(e.kind() == io::ErrorKind::InvalidInput, "wrong error kind: {e}");
    }
    Ok(())
}

#[test]
fn fresh_pair_reports_zero_available() -> TestResult {
    testinit();
    let (name, server) = create_unique(make_id!())?;
    let client = PipeEndpoint::open_only(&name, PipeMode::Messages)?;
    ensure!(client.mode() == PipeMode::Messages, "pipe type not picked up from the server");
    for ep in [&server, &client] {
        ensure!(ep.available().map_err(oerr)? == 0, "current-message peek not empty");
        ensure!(ep.total_available().map_err(oerr)? == 0, "total peek not empty");
    }
    Ok(())
}

#[test]
fn pending_read_resolves_after_write() -> TestResult {
    testinit();
    let (name, server) = create_unique(make_id!())?;
    let client = PipeEndpoint::open_only(&name, PipeMode::Messages)?;

    let mut buf = [0_u8; 64];
    let mut rreq: Option<AsyncRequest<'_>> = None;
    // SAFETY: buf outlives the wait below.
    let outcome = unsafe { server.read(&mut rreq, &mut buf) };
    ensure!(outcome == Outcome::Success, "read submission failed: {outcome:?}");
    let rreq = rreq.as_mut().ok_or_else(|| eyre!("no request was created"))?;
    ensure!(rreq.is_valid(), "submitted read not marked valid");

    let msg = b"ping";
    let mut wreq: Option<AsyncRequest<'_>> = None;
    // SAFETY: msg is 'static.
    let outcome = unsafe { client.write(&mut wreq, msg) };
    ensure!(outcome == Outcome::Success, "write submission failed: {outcome:?}");
    let sent = wreq.as_mut().ok_or_else(|| eyre!("no request was created"))?.wait().map_err(oerr)?;
    ensure!(sent == msg.len(), "short write: {sent}");

    let got = rreq.wait().map_err(oerr)?;
    ensure!(!rreq.is_valid(), "resolved request still marked valid");
    ensure!(buf.get(..got) == Some(&msg[..]), "message came back mangled");
    Ok(())
}

#[test]
fn short_buffer_reports_more_data_then_drains() -> TestResult {
    testinit();
    let (name, server) = create_unique(make_id!())?;
    let client = PipeEndpoint::open_only(&name, PipeMode::Messages)?;

    let msg = b"sixteen byte msg";
    let mut wreq: Option<AsyncRequest<'_>> = None;
    // SAFETY: msg is 'static.
    let outcome = unsafe { server.write(&mut wreq, msg) };
    ensure!(outcome == Outcome::Success, "write submission failed: {outcome:?}");
    wreq.as_mut().ok_or_else(|| eyre!("no request was created"))?.wait().map_err(oerr)?;
    await_data(&client)?;

    let mut short = [0_u8; 8];
    let mut rreq: Option<AsyncRequest<'_>> = None;
    // SAFETY: short outlives the wait below.
    let outcome = unsafe { client.read(&mut rreq, &mut short) };
    ensure!(outcome == Outcome::MoreData, "expected MoreData, got {outcome:?}");
    let rreq = rreq.as_mut().ok_or_else(|| eyre!("no request was created"))?;
    let head = rreq.wait().map_err(oerr)?;
    ensure!(head == short.len(), "partial read did not fill the buffer: {head}");

    let remaining = client.available().map_err(oerr)?;
    ensure!(remaining == msg.len() - head, "wrong remainder peeked: {remaining}");

    let mut rest = [0_u8; 64];
    let mut rreq2: Option<AsyncRequest<'_>> = None;
    // SAFETY: rest outlives the wait below.
    let outcome = unsafe { client.read(&mut rreq2, &mut rest) };
    ensure!(outcome == Outcome::Success, "drain submission failed: {outcome:?}");
    let tail = rreq2.as_mut().ok_or_else(|| eyre!("no request was created"))?.wait().map_err(oerr)?;
    ensure!(tail == remaining, "drain came up short: {tail}");

    let mut full = Vec::new();
    full.extend_from_slice(&short);
    full.extend_from_slice(&rest[..tail]);
    ensure!(full == msg, "reassembled message does not match");
    Ok(())
}

#[test]
fn request_reuse_does_not_leak() -> TestResult {
    const CYCLES: usize = 32;
    testinit();
    let (name, server) = create_unique(make_id!())?;
    let client = PipeEndpoint::open_only(&name, PipeMode::Messages)?;

    // Start from an explicitly pre-created request to cover that construction path too.
    let mut wreq = Some(AsyncRequest::new(client.as_handle())?);
    ensure!(!wreq.as_ref().is_some_and(AsyncRequest::is_valid), "fresh request claims validity");
    for i in 0..CYCLES {
        let msg = format!("message {i}");
        // SAFETY: msg outlives the wait below.
        let outcome = unsafe { client.write(&mut wreq, msg.as_bytes()) };
        ensure!(outcome == Outcome::Success, "write {i} submission failed: {outcome:?}");
        let sent = wreq.as_mut().ok_or_else(|| eyre!("request vanished"))?.wait().map_err(oerr)?;
        ensure!(sent == msg.len(), "short write on cycle {i}: {sent}");
    }

    let mut rreq: Option<AsyncRequest<'_>> = None;
    let mut buf = [0_u8; 128];
    for i in 0..CYCLES {
        await_data(&server)?;
        // SAFETY: buf outlives the wait below.
        let outcome = unsafe { server.read(&mut rreq, &mut buf) };
        ensure!(
            matches!(outcome, Outcome::Success | Outcome::MoreData),
            "read {i} submission failed: {outcome:?}"
        );
        let got = rreq.as_mut().ok_or_else(|| eyre!("request vanished"))?.wait().map_err(oerr)?;
        let expected = format!("message {i}");
        ensure!(buf.get(..got) == Some(expected.as_bytes()), "message {i} came back mangled");
    }
    Ok(())
}

#[test]
fn disconnect_is_reported_distinctly() -> TestResult {
    testinit();
    let (name, server) = create_unique(make_id!())?;
    let client = PipeEndpoint::open_only(&name, PipeMode::Messages)?;
    drop(server);

    ensure!(
        client.available() == Err(Outcome::Disconnected),
        "peek after disconnect did not report Disconnected"
    );
    ensure!(
        client.total_available() == Err(Outcome::Disconnected),
        "total peek after disconnect did not report Disconnected"
    );

    let mut buf = [0_u8; 8];
    let mut req: Option<AsyncRequest<'_>> = None;
    // SAFETY: the submission is refused, nothing retains buf.
    let outcome = unsafe { client.read(&mut req, &mut buf) };
    ensure!(outcome == Outcome::Disconnected, "read reported {outcome:?} instead");
    ensure!(
        !req.as_ref().is_some_and(AsyncRequest::is_valid),
        "refused read left the request valid"
    );

    // SAFETY: as above.
    let outcome = unsafe { client.write(&mut req, b"x") };
    ensure!(outcome == Outcome::Disconnected, "write reported {outcome:?} instead");
    ensure!(
        !req.as_ref().is_some_and(AsyncRequest::is_valid),
        "refused write left the request valid"
    );
    Ok(())
}
