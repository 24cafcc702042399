//! Rank-to-rank transport.
//!
//! [`Transport`] is the narrow set of primitives the orchestrator needs:
//! directed metadata messages, scatter and gather. Every call blocks until
//! its counterpart(s) reach the matching call. Scatter and gather are
//! collective: all ranks must call them in the same order, or the run
//! stalls.
//!
//! [`LocalTransport`] connects ranks with zero-capacity channels, one per
//! ordered pair, so each send is a rendezvous with the matching receive.
//! Buffers move by value; no rank can observe another rank's memory.

use crossbeam::channel::{bounded, Receiver, Sender};
use rowblur_core::{Channel, ColorPlane, PlaneSlice};
#[allow(unused_imports)]
use tracing::{debug, trace};

use crate::planner::PartitionMetadata;
use crate::{ComputeError, ComputeResult};

/// Rank of the coordinator.
pub const ROOT: usize = 0;

/// Collective and point-to-point primitives between ranks.
pub trait Transport: Send {
    /// This rank's index.
    fn rank(&self) -> usize;

    /// Number of ranks in the run.
    fn size(&self) -> usize;

    /// Sends partition metadata to `dest`. Blocks until received.
    fn send_metadata(&self, dest: usize, meta: PartitionMetadata) -> ComputeResult<()>;

    /// Receives partition metadata from `source`. Blocks until sent.
    fn recv_metadata(&self, source: usize) -> ComputeResult<PartitionMetadata>;

    /// Distributes `count` bytes of `plane` to every rank in rank order.
    ///
    /// `plane` must be `Some` on `root` and is ignored elsewhere. Each rank,
    /// `root` included, gets back the slice `[rank * count, (rank + 1) * count)`.
    fn scatter(
        &self,
        root: usize,
        plane: Option<&ColorPlane>,
        channel: Channel,
        count: usize,
    ) -> ComputeResult<PlaneSlice>;

    /// Collects every rank's slice on `root`.
    ///
    /// `root` passes the full-size destination plane and gets it back with
    /// each rank's bytes written in rank order; bytes no rank owns keep their
    /// prior value. Other ranks pass `None` and get `None`.
    fn gather(
        &self,
        root: usize,
        slice: PlaneSlice,
        target: Option<ColorPlane>,
    ) -> ComputeResult<Option<ColorPlane>>;
}

/// What a byte message is for; checked on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Scatter(Channel),
    Gather(Channel),
}

#[derive(Debug)]
enum Envelope {
    Metadata(PartitionMetadata),
    Bytes { tag: Tag, slice: PlaneSlice },
}

/// In-process transport endpoint for one rank.
pub struct LocalTransport {
    rank: usize,
    size: usize,
    /// Indexed by destination rank; `None` at our own index.
    outbox: Vec<Option<Sender<Envelope>>>,
    /// Indexed by source rank; `None` at our own index.
    inbox: Vec<Option<Receiver<Envelope>>>,
}

/// Builds a fully connected set of `size` endpoints, rank 0 first.
pub fn local_mesh(size: usize) -> Vec<LocalTransport> {
    let mut outboxes: Vec<Vec<Option<Sender<Envelope>>>> =
        (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
    let mut inboxes: Vec<Vec<Option<Receiver<Envelope>>>> =
        (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

    for src in 0..size {
        for dst in 0..size {
            if src == dst {
                continue;
            }
            let (tx, rx) = bounded(0);
            outboxes[src][dst] = Some(tx);
            inboxes[dst][src] = Some(rx);
        }
    }

    outboxes
        .into_iter()
        .zip(inboxes)
        .enumerate()
        .map(|(rank, (outbox, inbox))| LocalTransport {
            rank,
            size,
            outbox,
            inbox,
        })
        .collect()
}

impl LocalTransport {
    fn send(&self, dest: usize, env: Envelope) -> ComputeResult<()> {
        let tx = self
            .outbox
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or_else(|| self.bad_peer(dest))?;
        tx.send(env)
            .map_err(|_| ComputeError::Disconnected { peer: dest })
    }

    fn recv(&self, source: usize) -> ComputeResult<Envelope> {
        let rx = self
            .inbox
            .get(source)
            .and_then(Option::as_ref)
            .ok_or_else(|| self.bad_peer(source))?;
        rx.recv()
            .map_err(|_| ComputeError::Disconnected { peer: source })
    }

    fn recv_bytes(&self, source: usize, expected: Tag, count: usize) -> ComputeResult<PlaneSlice> {
        match self.recv(source)? {
            Envelope::Bytes { tag, slice } if tag == expected => {
                if slice.len() != count {
                    return Err(ComputeError::Protocol(format!(
                        "rank {} sent {} bytes for {:?}, expected {}",
                        source,
                        slice.len(),
                        tag,
                        count
                    )));
                }
                Ok(slice)
            }
            Envelope::Bytes { tag, .. } => Err(ComputeError::Protocol(format!(
                "rank {} expected {:?} from rank {}, got {:?}",
                self.rank, expected, source, tag
            ))),
            Envelope::Metadata(_) => Err(ComputeError::Protocol(format!(
                "rank {} expected {:?} from rank {}, got metadata",
                self.rank, expected, source
            ))),
        }
    }

    fn bad_peer(&self, peer: usize) -> ComputeError {
        ComputeError::Protocol(format!(
            "rank {} has no link to rank {} (size {})",
            self.rank, peer, self.size
        ))
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send_metadata(&self, dest: usize, meta: PartitionMetadata) -> ComputeResult<()> {
        trace!(rank = self.rank, dest, "send_metadata");
        self.send(dest, Envelope::Metadata(meta))
    }

    fn recv_metadata(&self, source: usize) -> ComputeResult<PartitionMetadata> {
        trace!(rank = self.rank, source, "recv_metadata");
        match self.recv(source)? {
            Envelope::Metadata(meta) => Ok(meta),
            Envelope::Bytes { tag, .. } => Err(ComputeError::Protocol(format!(
                "rank {} expected metadata from rank {}, got {:?}",
                self.rank, source, tag
            ))),
        }
    }

    fn scatter(
        &self,
        root: usize,
        plane: Option<&ColorPlane>,
        channel: Channel,
        count: usize,
    ) -> ComputeResult<PlaneSlice> {
        trace!(rank = self.rank, root, %channel, count, "scatter");
        let tag = Tag::Scatter(channel);

        if self.rank != root {
            return self.recv_bytes(root, tag, count);
        }

        let plane = plane.ok_or_else(|| {
            ComputeError::Protocol("scatter root called without a plane".to_string())
        })?;
        if plane.channel() != channel {
            return Err(ComputeError::Protocol(format!(
                "scatter of {} called with {} plane",
                channel,
                plane.channel()
            )));
        }

        for dest in (0..self.size).filter(|&r| r != root) {
            let slice = plane.slice(dest, count)?;
            self.send(dest, Envelope::Bytes { tag, slice })?;
        }
        debug!(%channel, ranks = self.size, count, "scattered plane");
        Ok(plane.slice(root, count)?)
    }

    fn gather(
        &self,
        root: usize,
        slice: PlaneSlice,
        target: Option<ColorPlane>,
    ) -> ComputeResult<Option<ColorPlane>> {
        let channel = slice.channel();
        let count = slice.len();
        trace!(rank = self.rank, root, %channel, count, "gather");
        let tag = Tag::Gather(channel);

        if self.rank != root {
            self.send(root, Envelope::Bytes { tag, slice })?;
            return Ok(None);
        }

        let mut target = target.ok_or_else(|| {
            ComputeError::Protocol("gather root called without a target plane".to_string())
        })?;

        for source in 0..self.size {
            let part = if source == root {
                // Placed by rank order, whatever offset the slice carries.
                PlaneSlice::new(channel, source * count, slice.data().to_vec())
            } else {
                let part = self.recv_bytes(source, tag, count)?;
                PlaneSlice::new(channel, source * count, part.into_data())
            };
            target.write_slice(&part)?;
        }
        debug!(%channel, ranks = self.size, count, "gathered plane");
        Ok(Some(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn meta(start_row: u32) -> PartitionMetadata {
        PartitionMetadata {
            row_span: 1,
            start_row,
            end_row: start_row + 1,
            element_count: 2,
            width: 2,
            height: 3,
        }
    }

    #[test]
    fn test_mesh_ranks() {
        let mesh = local_mesh(3);
        let ranks: Vec<_> = mesh.iter().map(|t| (t.rank(), t.size())).collect();
        assert_eq!(ranks, vec![(0, 3), (1, 3), (2, 3)]);
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut mesh = local_mesh(2);
        let worker = mesh.pop().unwrap();
        let root = mesh.pop().unwrap();

        let handle = thread::spawn(move || worker.recv_metadata(ROOT).unwrap());
        root.send_metadata(1, meta(1)).unwrap();
        assert_eq!(handle.join().unwrap(), meta(1));
    }

    #[test]
    fn test_scatter_gather_three_ranks() {
        let plane = ColorPlane::new(Channel::Red, 3, 2, (0..6).collect()).unwrap();
        let mesh = local_mesh(3);

        let results: Vec<Option<ColorPlane>> = thread::scope(|s| {
            let handles: Vec<_> = mesh
                .into_iter()
                .map(|t| {
                    let src = plane.clone();
                    s.spawn(move || {
                        let is_root = t.rank() == ROOT;
                        let source = is_root.then_some(&src);
                        let slice = t.scatter(ROOT, source, Channel::Red, 2).unwrap();
                        assert_eq!(slice.data(), &src.data()[t.rank() * 2..t.rank() * 2 + 2]);

                        let doubled: Vec<u8> = slice.data().iter().map(|v| v * 2).collect();
                        let mut slice = slice;
                        slice.replace_data(doubled).unwrap();
                        let target = is_root.then(|| src.clone());
                        t.gather(ROOT, slice, target).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let gathered = results[0].as_ref().unwrap();
        assert_eq!(gathered.data(), &[0, 2, 4, 6, 8, 10]);
        assert!(results[1].is_none());
        assert!(results[2].is_none());
    }

    #[test]
    fn test_gather_keeps_uncovered_tail() {
        let plane = ColorPlane::new(Channel::Blue, 5, 1, vec![9; 5]).unwrap();
        let mesh = local_mesh(2);

        let root_out = thread::scope(|s| {
            let handles: Vec<_> = mesh
                .into_iter()
                .map(|t| {
                    let src = plane.clone();
                    s.spawn(move || {
                        let is_root = t.rank() == ROOT;
                        let slice = t
                            .scatter(ROOT, is_root.then_some(&src), Channel::Blue, 2)
                            .unwrap();
                        let mut slice = slice;
                        slice.replace_data(vec![1, 1]).unwrap();
                        t.gather(ROOT, slice, is_root.then(|| src.clone())).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });

        assert_eq!(root_out[0].as_ref().unwrap().data(), &[1, 1, 1, 1, 9]);
    }

    #[test]
    fn test_tag_mismatch_is_protocol_error() {
        let mut mesh = local_mesh(2);
        let worker = mesh.pop().unwrap();
        let root = mesh.pop().unwrap();

        let handle = thread::spawn(move || worker.recv_metadata(ROOT));
        let plane = ColorPlane::new(Channel::Red, 2, 1, vec![1, 2]).unwrap();
        root.scatter(ROOT, Some(&plane), Channel::Red, 1).unwrap();

        assert!(matches!(
            handle.join().unwrap(),
            Err(ComputeError::Protocol(_))
        ));
    }

    #[test]
    fn test_dropped_peer_is_disconnect() {
        let mut mesh = local_mesh(2);
        let worker = mesh.pop().unwrap();
        drop(mesh);

        assert!(matches!(
            worker.recv_metadata(ROOT),
            Err(ComputeError::Disconnected { peer: 0 })
        ));
    }

    #[test]
    fn test_root_without_plane() {
        let mesh = local_mesh(1);
        assert!(matches!(
            mesh[0].scatter(ROOT, None, Channel::Green, 1),
            Err(ComputeError::Protocol(_))
        ));
    }

    #[test]
    fn test_self_link_rejected() {
        let mesh = local_mesh(2);
        assert!(matches!(
            mesh[0].send_metadata(0, meta(0)),
            Err(ComputeError::Protocol(_))
        ));
    }
}
