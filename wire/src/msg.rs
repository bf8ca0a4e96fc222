use std::{borrow::Cow, io};

use crate::{
    Deserialize, Serialize,
    specs::{
        queue::QueueMsg,
        registry::RegistryMsg,
        serving::{Call, Reply},
    },
};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const CALL_H: Header = 0;
const REPLY_H: Header = 1;
const VECTOR_H: Header = 2;
const QUEUE_H: Header = 3;
const REGISTRY_H: Header = 4;

/// The application layer message for the entire system.
///
/// `Vector` carries raw embedding components and is written without
/// copying; every other variant travels as a JSON body.
#[derive(Debug)]
pub enum Msg<'a> {
    Call(Call),
    Reply(Reply),
    Vector(Cow<'a, [f32]>),
    Queue(QueueMsg),
    Registry(RegistryMsg),
}

impl Msg<'_> {
    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }

    fn put_json<T: serde::Serialize>(kind: Header, body: &T, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&kind.to_be_bytes());

        // SAFETY: every body type derives its Serialize impl and only
        //         contains string-keyed maps, so this cannot fail.
        serde_json::to_writer(buf, body).unwrap();
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Call(call) => Self::put_json(CALL_H, call, buf),
            Msg::Reply(reply) => Self::put_json(REPLY_H, reply, buf),
            Msg::Queue(msg) => Self::put_json(QUEUE_H, msg, buf),
            Msg::Registry(msg) => Self::put_json(REGISTRY_H, msg, buf),
            Msg::Vector(nums) => {
                buf.extend_from_slice(&VECTOR_H.to_be_bytes());
                return Some(bytemuck::cast_slice(nums.as_ref()));
            }
        }

        None
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len());
        }

        let (kind_buf, rest) = buf.split_at(HEADER_SIZE);

        // SAFETY: We splitted the buffer to be of size `HEADER_SIZE` just above.
        let kind = Header::from_be_bytes(kind_buf.try_into().unwrap());

        match kind {
            CALL_H => Ok(Self::Call(serde_json::from_slice(rest)?)),
            REPLY_H => Ok(Self::Reply(serde_json::from_slice(rest)?)),
            QUEUE_H => Ok(Self::Queue(serde_json::from_slice(rest)?)),
            REGISTRY_H => Ok(Self::Registry(serde_json::from_slice(rest)?)),
            VECTOR_H => {
                if rest.len() % size_of::<f32>() != 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Vector body length {} is not a multiple of 4", rest.len()),
                    ));
                }

                // The receive buffer carries no alignment guarantee, so the
                // components are gathered into an owned vector.
                let nums: Vec<f32> = bytemuck::pod_collect_to_vec(rest);
                Ok(Self::Vector(Cow::Owned(nums)))
            }
            kind => Self::invalid_kind(kind),
        }
    }
}
