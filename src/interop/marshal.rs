//! Marshaling between native response data and remote objects
//!
//! Encoders allocate in the caller's local frame and report allocation or
//! construction failure with the matching bridge error. Decoders validate
//! shape element by element and copy everything into owned native data.

use super::env::{Arg, FieldRef, ObjRef, RemoteEnv};
use super::symbols::{
    ComplexFields, DecodeSymbols, EncodeSymbols, CHANNEL_FIELD, COMPLEX_CLASS, FREQS_FIELD,
    NETWORK_FIELD, RECORD_CLASS, SITE_FIELD, SPECTRA_FIELD, STATION_FIELD,
};
use crate::error::{BridgeError, DecodeError};
use crate::response::{
    truncate_ident, ChannelId, ComplexValue, ResponseList, ResponseRecord, ShapeError,
    CHANNEL_LEN, LOCATION_LEN, NETWORK_LEN, STATION_LEN,
};

// ============================================================================
// Encoding
// ============================================================================

pub fn encode_text<E: RemoteEnv + ?Sized>(env: &mut E, text: &str) -> Result<ObjRef, BridgeError> {
    env.new_string(text).ok_or_else(|| {
        env.take_fault();
        BridgeError::allocation("Java string")
    })
}

pub fn encode_doubles<E: RemoteEnv + ?Sized>(
    env: &mut E,
    values: &[f64],
) -> Result<ObjRef, BridgeError> {
    env.new_double_array(values).ok_or_else(|| {
        env.take_fault();
        BridgeError::allocation("Java double array")
    })
}

/// Build a remote array of complex values
pub fn encode_spectrum<E: RemoteEnv + ?Sized>(
    env: &mut E,
    symbols: &EncodeSymbols,
    values: &[ComplexValue],
) -> Result<ObjRef, BridgeError> {
    let array = env.new_object_array(symbols.complex_class, values.len()).ok_or_else(|| {
        env.take_fault();
        BridgeError::allocation("'ComplexBlk' array")
    })?;

    for (i, value) in values.iter().enumerate() {
        let element = env
            .new_object(
                symbols.complex_class,
                symbols.complex_ctor,
                &[Arg::Double(value.real()), Arg::Double(value.imag())],
            )
            .ok_or_else(|| {
                env.take_fault();
                BridgeError::construction(COMPLEX_CLASS)
            })?;
        let stored = env.set_array_element(array, i, element);
        env.release(element);
        if !stored {
            env.take_fault();
            return Err(BridgeError::allocation("'ComplexBlk' array element"));
        }
    }
    Ok(array)
}

/// Build one remote response record
pub fn encode_record<E: RemoteEnv + ?Sized>(
    env: &mut E,
    symbols: &EncodeSymbols,
    record: &ResponseRecord,
) -> Result<ObjRef, BridgeError> {
    let station = encode_text(env, record.station())?;
    let channel = encode_text(env, record.channel())?;
    let network = encode_text(env, record.network())?;
    let site = encode_text(env, record.location())?;
    let spectra = encode_spectrum(env, symbols, record.spectrum())?;
    let freqs = encode_doubles(env, record.frequencies())?;

    let args = [
        Arg::Object(station),
        Arg::Object(channel),
        Arg::Object(network),
        Arg::Object(site),
        Arg::Object(spectra),
        Arg::Object(freqs),
    ];
    let built = env.new_object(symbols.record_class, symbols.record_ctor, &args);
    for obj in [station, channel, network, site, spectra, freqs] {
        env.release(obj);
    }
    built.ok_or_else(|| {
        env.take_fault();
        BridgeError::construction(RECORD_CLASS)
    })
}

/// Build a remote record array preserving list order
pub fn encode_list<E: RemoteEnv + ?Sized>(
    env: &mut E,
    symbols: &EncodeSymbols,
    list: &ResponseList,
) -> Result<ObjRef, BridgeError> {
    let array = env.new_object_array(symbols.record_class, list.len()).ok_or_else(|| {
        env.take_fault();
        BridgeError::allocation("'RespInfoBlk' array")
    })?;

    for (i, record) in list.iter().enumerate() {
        let element = encode_record(env, symbols, record)?;
        let stored = env.set_array_element(array, i, element);
        env.release(element);
        if !stored {
            env.take_fault();
            return Err(BridgeError::allocation("'RespInfoBlk' array element"));
        }
    }
    Ok(array)
}

// ============================================================================
// Decoding
// ============================================================================

/// Read a string field, truncated to the identifier capacity
pub fn decode_text<E: RemoteEnv + ?Sized>(
    env: &mut E,
    symbols: &DecodeSymbols,
    obj: ObjRef,
    field: FieldRef,
    index: usize,
    name: &'static str,
    capacity: usize,
) -> Result<String, DecodeError> {
    let bad = DecodeError::FieldContents { index, field: name };
    let value = env.object_field(obj, field).ok_or(bad.clone())?;
    let text = if env.is_instance_of(value, symbols.string_class) {
        env.string_value(value)
    } else {
        None
    };
    env.release(value);
    text.map(|t| truncate_ident(&t, capacity)).ok_or(bad)
}

/// Read a double-array field
pub fn decode_doubles<E: RemoteEnv + ?Sized>(
    env: &mut E,
    symbols: &DecodeSymbols,
    obj: ObjRef,
    index: usize,
) -> Result<Vec<f64>, DecodeError> {
    let bad = DecodeError::FieldContents { index, field: FREQS_FIELD };
    let value = env.object_field(obj, symbols.record.freqs).ok_or(bad.clone())?;
    let values = if env.is_instance_of(value, symbols.double_array_class) {
        env.double_array_value(value)
    } else {
        None
    };
    env.release(value);
    values.ok_or(bad)
}

/// Read a complex-value array field
pub fn decode_spectrum<E: RemoteEnv + ?Sized>(
    env: &mut E,
    symbols: &DecodeSymbols,
    obj: ObjRef,
    index: usize,
) -> Result<Vec<ComplexValue>, DecodeError> {
    let bad = DecodeError::FieldContents { index, field: SPECTRA_FIELD };
    let array = env.object_field(obj, symbols.record.spectra).ok_or(bad.clone())?;
    let result = decode_complex_array(env, &symbols.complex, symbols, array, &bad);
    env.release(array);
    result
}

fn decode_complex_array<E: RemoteEnv + ?Sized>(
    env: &mut E,
    complex: &ComplexFields,
    symbols: &DecodeSymbols,
    array: ObjRef,
    bad: &DecodeError,
) -> Result<Vec<ComplexValue>, DecodeError> {
    if !env.is_instance_of(array, symbols.object_array_class) {
        return Err(bad.clone());
    }
    let len = env.array_length(array).ok_or(bad.clone())?;
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        let element = env.array_element(array, i).ok_or(bad.clone())?;
        let value = if env.is_instance_of(element, complex.class) {
            env.double_field(element, complex.real)
                .zip(env.double_field(element, complex.imag))
                .map(|(re, im)| ComplexValue::new(re, im))
        } else {
            None
        };
        env.release(element);
        values.push(value.ok_or(bad.clone())?);
    }
    Ok(values)
}

/// Convert one remote record into a native record
pub fn decode_record<E: RemoteEnv + ?Sized>(
    env: &mut E,
    symbols: &DecodeSymbols,
    obj: ObjRef,
    index: usize,
) -> Result<ResponseRecord, DecodeError> {
    let fields = symbols.record;
    let station = decode_text(env, symbols, obj, fields.station, index, STATION_FIELD, STATION_LEN)?;
    let channel = decode_text(env, symbols, obj, fields.channel, index, CHANNEL_FIELD, CHANNEL_LEN)?;
    let network = decode_text(env, symbols, obj, fields.network, index, NETWORK_FIELD, NETWORK_LEN)?;
    let location = decode_text(env, symbols, obj, fields.site, index, SITE_FIELD, LOCATION_LEN)?;
    let spectrum = decode_spectrum(env, symbols, obj, index)?;
    let frequencies = decode_doubles(env, symbols, obj, index)?;

    let id = ChannelId::new(&station, &channel, &network, &location);
    ResponseRecord::new(id, frequencies, spectrum).map_err(|err| match err {
        ShapeError::Empty => DecodeError::FieldContents { index, field: SPECTRA_FIELD },
        ShapeError::LengthMismatch { spectrum, frequencies } => {
            DecodeError::LengthMismatch { index, spectrum, frequencies }
        }
    })
}

/// Convert a returned record array into a response list, in array order
pub fn decode_list<E: RemoteEnv + ?Sized>(
    env: &mut E,
    symbols: &DecodeSymbols,
    result: ObjRef,
) -> Result<ResponseList, DecodeError> {
    if !env.is_instance_of(result, symbols.object_array_class) {
        return Err(DecodeError::NotAnArray);
    }
    let len = env.array_length(result).ok_or(DecodeError::NotAnArray)?;
    if len == 0 {
        return Err(DecodeError::EmptyResult);
    }

    let mut list = ResponseList::with_capacity(len);
    for index in 0..len {
        let Some(element) = env.array_element(result, index) else {
            env.take_fault();
            return Err(DecodeError::ElementType { index });
        };
        if !env.is_instance_of(element, symbols.record.class) {
            env.release(element);
            return Err(DecodeError::ElementType { index });
        }
        let record = decode_record(env, symbols, element, index);
        env.release(element);
        list.push(record?);
    }
    Ok(list)
}
