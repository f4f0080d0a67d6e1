use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::Result;
use serde_json::json;
use tokio::net::TcpListener;
use crate::capture::{Meter, Traffic};
use crate::clock::Timestamp;
use crate::error::Error;
use crate::shutdown::Shutdown;
use crate::sockets::Correlation;
use crate::store::{self, ConnectionSample, InterfaceSample, Page, Status, Store};
use super::*;

fn api() -> Result<(Api, Arc<Store>, Arc<Traffic>)> {
    let ttl   = Duration::from_secs(60);
    let store = Arc::new(Store::new(&store::Config {
        retention: store::Retention {
            interfaces:  ttl,
            connections: ttl,
            packets:     ttl,
        },
        capacity: 1_000,
        limit:    50,
    }));

    let conns = (0..10).map(|n| ConnectionSample {
        local_address:  format!("10.0.0.1:{}", 5000 + n).parse().unwrap(),
        remote_address: "93.184.216.34:443".parse().unwrap(),
        owning_pid:     100 + n,
        status:         match n < 3 {
            true  => Status::Established,
            false => Status::TimeWait,
        },
        captured_at:    Timestamp(1_000 + n as i64),
    }).collect::<Vec<_>>();
    store.append(conns)?;

    store.append(vec![InterfaceSample {
        interface_name:        "eth0".to_owned(),
        bytes_sent_cumulative: 1_500,
        bytes_recv_cumulative: 3_000,
        upload_speed:          Some(500.0),
        download_speed:        None,
        captured_at:           Timestamp(2_000),
        anomaly:               None,
    }])?;

    let traffic = Arc::new(Traffic::new());
    Ok((Api::new(store.clone(), traffic.clone()), store, traffic))
}

// inbound Ethernet + IPv4 + TCP header
fn frame(sport: u16, dport: u16) -> Vec<u8> {
    let mut data = vec![0u8; 14 + 20 + 20];
    data[12] = 0x08;
    data[14] = 0x45;
    data[16..18].copy_from_slice(&40u16.to_be_bytes());
    data[23] = 6;
    data[34..36].copy_from_slice(&sport.to_be_bytes());
    data[36..38].copy_from_slice(&dport.to_be_bytes());
    data
}

#[test]
fn connections_are_filtered() -> Result<()> {
    let (api, _, _) = api()?;

    let page = api.connections("status=ESTABLISHED")?;
    assert_eq!(page.total, 10);
    assert_eq!(page.count, 3);
    assert!(page.data.iter().all(|c| c.status == Status::Established));

    let page = api.connections("")?;
    assert_eq!(page.count, 10);
    assert_eq!(page.data[0].owning_pid, 109);

    Ok(())
}

#[test]
fn unknown_filter_key_is_rejected() -> Result<()> {
    let (api, _, _) = api()?;

    match api.interfaces("colour=blue") {
        Err(Error::InvalidFilter(_)) => (),
        other                        => panic!("unexpected {:?}", other),
    }

    let res = api.handle(Request::Packets(Select {
        filter: "owning_pid".to_owned(),
        ..Select::default()
    }));
    assert!(matches!(res, Response::Error { .. }));

    Ok(())
}

#[test]
fn requests_select_fields_and_limit() -> Result<()> {
    let (api, _, _) = api()?;

    let res = api.handle(Request::Connections(Select {
        filter: "status=TIME_WAIT".to_owned(),
        fields: vec!["owning_pid".to_owned()],
        limit:  Some(2),
    }));

    assert_eq!(res, Response::Page(Page {
        data:  vec![json!({"owning_pid": 109}), json!({"owning_pid": 108})],
        total: 10,
        count: 2,
    }));

    Ok(())
}

#[test]
fn requests_use_tagged_json() -> Result<()> {
    let req = serde_json::from_str::<Request>(r#"{"kind": "interfaces", "filter": "interface_name=eth0"}"#)?;
    assert_eq!(req, Request::Interfaces(Select {
        filter: "interface_name=eth0".to_owned(),
        ..Select::default()
    }));

    let req = serde_json::from_str::<Request>(r#"{"kind": "attribution"}"#)?;
    assert_eq!(req, Request::Attribution);

    Ok(())
}

#[test]
fn attribution_reports_accumulated_bytes() -> Result<()> {
    let (api, _, traffic) = api()?;
    assert!(api.attribution().is_empty());

    let table = Arc::new(Correlation::new());
    table.publish(vec![(5000, 443, 42)], Instant::now(), Duration::from_secs(60));

    let data = frame(443, 5000);
    let frame = crate::capture::decode(&data, 1200, Timestamp(1)).expect("frame");
    traffic.attribute(&table.view(), &frame);

    let res = api.handle(Request::Attribution);
    assert_eq!(res, Response::Attribution(vec![Attributed {
        owning_pid:     42,
        upload_bytes:   0,
        download_bytes: 1200,
        upload_speed:   None,
        download_speed: None,
    }]));

    let wire = serde_json::to_string(&res)?;
    assert_eq!(serde_json::from_str::<Response>(&wire)?, res);

    Ok(())
}

#[test]
fn attribution_reports_interval_rates() -> Result<()> {
    let (api, _, traffic) = api()?;

    let table = Arc::new(Correlation::new());
    table.publish(vec![(5000, 443, 42), (6000, 443, 7)], Instant::now(), Duration::from_secs(60));
    let view = table.view();

    let data  = frame(443, 5000);
    let first = crate::capture::decode(&data, 1000, Timestamp(1)).expect("frame");
    traffic.attribute(&view, &first);

    let t0 = Instant::now();
    let mut meter = Meter::new(Duration::from_secs(1));
    assert!(meter.update(traffic.snapshot(), t0).is_empty());

    traffic.attribute(&view, &first);
    let data = frame(443, 6000);
    let other = crate::capture::decode(&data, 600, Timestamp(2)).expect("frame");
    traffic.attribute(&view, &other);

    traffic.publish(meter.update(traffic.snapshot(), t0 + Duration::from_secs(2)));

    let list = api.attribution();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].owning_pid,     7);
    assert_eq!(list[0].download_speed, Some(300.0));
    assert_eq!(list[1].owning_pid,     42);
    assert_eq!(list[1].download_bytes, 2000);
    assert_eq!(list[1].download_speed, Some(500.0));
    assert_eq!(list[1].upload_speed,   Some(0.0));

    traffic.publish(meter.update(traffic.snapshot(), t0 + Duration::from_secs(3)));
    assert_eq!(api.attribution()[1].download_speed, Some(0.0));

    Ok(())
}

#[tokio::test]
async fn endpoint_answers_over_tcp() -> Result<()> {
    let (api, _, _) = api()?;
    let shutdown = Shutdown::new();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr     = listener.local_addr()?;
    let server   = tokio::spawn(serve(listener, Arc::new(api), shutdown.clone()));

    let res = request(addr, Request::Connections(Select {
        filter: "status=ESTABLISHED".to_owned(),
        ..Select::default()
    })).await?;

    match res {
        Response::Page(page) => {
            assert_eq!(page.total, 10);
            assert_eq!(page.count, 3);
            assert_eq!(page.data[0]["status"], "ESTABLISHED");
        },
        other => panic!("unexpected {:?}", other),
    }

    let res = request(addr, Request::Interfaces(Select {
        filter: "bogus=1".to_owned(),
        ..Select::default()
    })).await?;
    assert!(matches!(res, Response::Error { .. }));

    let res = request(addr, Request::Attribution).await?;
    assert_eq!(res, Response::Attribution(Vec::new()));

    shutdown.signal();
    server.await?;

    Ok(())
}
