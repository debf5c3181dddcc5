use cafe_class_file::{
    attributes::{CodeAttribute, ExceptionTableEntry},
    AccessFlags, Attribute, AttributeInfo, Attributes, ClassFile, ClassFileError, CpInfo,
    ParseMode,
};

fn with_class_file(f: impl FnOnce(ClassFile)) {
    f(ClassFile::from_bytes(&my_class()).unwrap());
}

/// `my/MyClass` with a constant int field, a constructor and an `add` method,
/// built through the authoring API and written out.
fn my_class() -> Vec<u8> {
    let mut class_file = ClassFile::create("my/MyClass", None).unwrap();
    class_file.add_interface("java/io/Serializable").unwrap();

    let value = class_file.constant_pool.push(CpInfo::Integer(42)).unwrap();
    let constant_value = Attribute::new(
        &mut class_file.constant_pool,
        "ConstantValue",
        AttributeInfo::ConstantValue {
            constantvalue_index: value,
        },
    )
    .unwrap();
    class_file
        .add_field(AccessFlags::FINAL | AccessFlags::PRIVATE, "myField", "I")
        .unwrap()
        .attributes
        .push(constant_value);

    let line_numbers = Attribute::new(
        &mut class_file.constant_pool,
        "LineNumberTable",
        AttributeInfo::Unknown(vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x03]),
    )
    .unwrap();
    let code = Attribute::new(
        &mut class_file.constant_pool,
        "Code",
        AttributeInfo::Code(CodeAttribute {
            max_stack: 1,
            max_locals: 1,
            code: vec![0x2a, 0xb7, 0x00, 0x01, 0xb1],
            exception_table: vec![],
            attributes: Attributes(vec![line_numbers]),
        }),
    )
    .unwrap();
    class_file
        .add_method(AccessFlags::PUBLIC, "<init>", "()V")
        .unwrap()
        .attributes
        .push(code);

    let exception = class_file
        .constant_pool
        .create_class("java/lang/ArithmeticException")
        .unwrap();
    let exceptions = Attribute::new(
        &mut class_file.constant_pool,
        "Exceptions",
        AttributeInfo::Exceptions {
            exception_index_table: vec![exception],
        },
    )
    .unwrap();
    let code = Attribute::new(
        &mut class_file.constant_pool,
        "Code",
        AttributeInfo::Code(CodeAttribute {
            max_stack: 2,
            max_locals: 2,
            code: vec![0x1b, 0x86, 0xae],
            exception_table: vec![ExceptionTableEntry {
                start_pc: 0,
                end_pc: 2,
                handler_pc: 2,
                catch_type: exception,
            }],
            attributes: Attributes::default(),
        }),
    )
    .unwrap();
    let add = class_file
        .add_method(AccessFlags::PUBLIC, "add", "(I)F")
        .unwrap();
    add.attributes.push(code);
    add.attributes.push(exceptions);

    let source_file = class_file.constant_pool.create_utf8("MyClass.java").unwrap();
    let source_file = Attribute::new(
        &mut class_file.constant_pool,
        "SourceFile",
        AttributeInfo::Unknown(source_file.to_be_bytes().to_vec()),
    )
    .unwrap();
    class_file.attributes.push(source_file);

    class_file.to_bytes().unwrap()
}

/// A hand-assembled class `Foo` with a Long constant, a static final field and
/// a `run` method whose Code attribute nests a ConstantValue attribute.
#[rustfmt::skip]
fn foo_class() -> Vec<u8> {
    vec![
        0xca, 0xfe, 0xba, 0xbe,
        0x00, 0x00, 0x00, 0x34,
        0x00, 0x0f,
        0x01, 0x00, 0x03, b'F', b'o', b'o',
        0x07, 0x00, 0x01,
        0x01, 0x00, 0x10, b'j', b'a', b'v', b'a', b'/', b'l', b'a', b'n', b'g', b'/',
                          b'O', b'b', b'j', b'e', b'c', b't',
        0x07, 0x00, 0x03,
        0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
        0x01, 0x00, 0x04, b'C', b'o', b'd', b'e',
        0x01, 0x00, 0x0d, b'C', b'o', b'n', b's', b't', b'a', b'n', b't',
                          b'V', b'a', b'l', b'u', b'e',
        0x01, 0x00, 0x0a, b'S', b'o', b'u', b'r', b'c', b'e', b'F', b'i', b'l', b'e',
        0x01, 0x00, 0x08, b'F', b'o', b'o', b'.', b'j', b'a', b'v', b'a',
        0x01, 0x00, 0x03, b'r', b'u', b'n',
        0x01, 0x00, 0x03, b'(', b')', b'V',
        0x01, 0x00, 0x01, b'X',
        0x01, 0x00, 0x01, b'J',
        // access_flags, this_class, super_class
        0x00, 0x21, 0x00, 0x02, 0x00, 0x04,
        // interfaces
        0x00, 0x00,
        // fields
        0x00, 0x01,
        0x00, 0x18, 0x00, 0x0d, 0x00, 0x0e,
        0x00, 0x01,
        0x00, 0x08, 0x00, 0x00, 0x00, 0x02, 0x00, 0x05,
        // methods
        0x00, 0x01,
        0x00, 0x01, 0x00, 0x0b, 0x00, 0x0c,
        0x00, 0x01,
        0x00, 0x07, 0x00, 0x00, 0x00, 0x15,
        0x00, 0x02, 0x00, 0x04,
        0x00, 0x00, 0x00, 0x01, 0xb1,
        0x00, 0x00,
        0x00, 0x01,
        0x00, 0x08, 0x00, 0x00, 0x00, 0x02, 0x00, 0x05,
        // attributes
        0x00, 0x01,
        0x00, 0x09, 0x00, 0x00, 0x00, 0x02, 0x00, 0x0a,
    ]
}

#[test]
fn test_super_class() {
    with_class_file(|class_file| {
        assert_eq!(
            Some("java/lang/Object"),
            class_file.super_class().unwrap().as_deref()
        )
    });
}

#[test]
fn test_class_name() {
    with_class_file(|class_file| assert_eq!("my/MyClass", class_file.class_name().unwrap()));
}

#[test]
fn test_interface_names() {
    with_class_file(|class_file| {
        assert_eq!(
            vec!["java/io/Serializable"],
            class_file.interface_names().unwrap()
        )
    });
}

#[test]
fn test_field_name() {
    with_class_file(|class_file| {
        assert_eq!(
            "myField",
            class_file.field_name(&class_file.fields[0]).unwrap()
        )
    });
}

#[test]
fn test_int_field_type() {
    with_class_file(|class_file| {
        assert_eq!(
            "I",
            class_file.field_descriptor(&class_file.fields[0]).unwrap()
        )
    });
}

#[test]
fn test_field_access_flags() {
    with_class_file(|class_file| {
        assert_eq!(
            AccessFlags::FINAL | AccessFlags::PRIVATE,
            class_file.fields[0].access_flags
        )
    });
}

#[test]
fn test_field_constant_value() {
    with_class_file(|class_file| {
        let index = class_file.fields[0].attributes.constant_value().unwrap();
        assert_eq!(
            &CpInfo::Integer(42),
            class_file.constant_pool.get(index).unwrap()
        )
    });
}

#[test]
fn test_constructor_name() {
    with_class_file(|class_file| {
        assert_eq!(
            "<init>",
            class_file.method_name(&class_file.methods[0]).unwrap()
        )
    });
}

#[test]
fn test_constructor_descriptor() {
    with_class_file(|class_file| {
        assert_eq!(
            "()V",
            class_file
                .method_descriptor(&class_file.methods[0])
                .unwrap()
        )
    });
}

#[test]
fn test_constructor_code() {
    with_class_file(|class_file| {
        let code = class_file.methods[0].attributes.code_attribute().unwrap();
        assert_eq!(vec![0x2a, 0xb7, 0x00, 0x01, 0xb1], code.code);

        let line_numbers = code
            .attributes
            .find_by_name("LineNumberTable", &class_file.constant_pool)
            .unwrap();
        assert_eq!(
            AttributeInfo::Unknown(vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x03]),
            line_numbers.info
        );
    });
}

#[test]
fn test_method_name() {
    with_class_file(|class_file| {
        assert_eq!(
            "add",
            class_file.method_name(&class_file.methods[1]).unwrap()
        )
    });
}

#[test]
fn test_method_descriptor() {
    with_class_file(|class_file| {
        assert_eq!(
            "(I)F",
            class_file
                .method_descriptor(&class_file.methods[1])
                .unwrap()
        )
    });
}

#[test]
fn test_method_access_flags() {
    with_class_file(|class_file| {
        assert_eq!(AccessFlags::PUBLIC, class_file.methods[1].access_flags)
    });
}

#[test]
fn test_method_exceptions() {
    with_class_file(|class_file| {
        let attributes = &class_file.methods[1].attributes;
        let exceptions = attributes.exceptions().unwrap();
        assert_eq!(
            "java/lang/ArithmeticException",
            class_file.constant_pool.class_name(exceptions[0]).unwrap()
        );

        let code = attributes.code_attribute().unwrap();
        assert_eq!(exceptions[0], code.exception_table[0].catch_type);
    });
}

#[test]
fn test_source_file_is_kept_opaque() {
    with_class_file(|class_file| {
        let source_file = class_file
            .attributes
            .find_by_name("SourceFile", &class_file.constant_pool)
            .unwrap();
        let AttributeInfo::Unknown(ref bytes) = source_file.info else {
            panic!("SourceFile should not be interpreted");
        };
        let index = u16::from_be_bytes([bytes[0], bytes[1]]);
        assert_eq!(
            "MyClass.java",
            class_file.constant_pool.utf8_str(index).unwrap()
        );
    });
}

#[test]
fn test_round_trip_of_an_authored_class() {
    let bytes = my_class();
    let class_file = ClassFile::from_bytes(&bytes).unwrap();
    let written = class_file.to_bytes().unwrap();

    assert_eq!(bytes, written);
    assert_eq!(class_file, ClassFile::from_bytes(&written).unwrap());
}

#[test]
fn test_round_trip_of_a_hand_assembled_class() {
    let bytes = foo_class();
    let class_file = ClassFile::from_bytes(&bytes).unwrap();

    assert_eq!(bytes, class_file.to_bytes().unwrap());
}

#[test]
fn test_version_is_stored_major_first() {
    let class_file = ClassFile::from_bytes(&foo_class()).unwrap();

    assert_eq!((0x34, 0), class_file.version);
    assert_eq!(0x34, class_file.major_version());
    assert_eq!(0, class_file.minor_version());
    assert_eq!(None, class_file.version_name());
}

#[test]
fn test_long_occupies_two_slots() {
    let class_file = ClassFile::from_bytes(&foo_class()).unwrap();
    let constant_pool = &class_file.constant_pool;

    assert_eq!(15, constant_pool.count().unwrap());
    assert_eq!(13, constant_pool.len());
    assert_eq!(&CpInfo::Long(1), constant_pool.get(5).unwrap());
    assert!(matches!(
        constant_pool.get(6),
        Err(ClassFileError::InvalidConstantIndex { index: 6, .. })
    ));
    assert_eq!("Code", constant_pool.utf8_str(7).unwrap());
}

#[test]
fn test_code_attribute_nests_known_attributes() {
    let class_file = ClassFile::from_bytes(&foo_class()).unwrap();
    let code = class_file.methods[0].attributes.code_attribute().unwrap();

    assert_eq!(2, code.max_stack);
    assert_eq!(4, code.max_locals);
    assert_eq!(vec![0xb1], code.code);
    assert_eq!(Some(5), code.attributes.constant_value());
}

#[test]
fn test_bad_magic() {
    let mut bytes = foo_class();
    bytes[..4].copy_from_slice(&[0, 0, 0, 0]);

    assert!(matches!(
        ClassFile::from_bytes(&bytes),
        Err(ClassFileError::InvalidMagicIdentifier(0))
    ));
}

#[test]
fn test_invalid_constant_tag() {
    let mut bytes = foo_class();
    bytes[10] = 0xff;

    assert!(matches!(
        ClassFile::from_bytes(&bytes),
        Err(ClassFileError::MalformedConstantPool(_))
    ));
}

#[test]
fn test_truncated_class_file() {
    let bytes = foo_class();

    assert!(ClassFile::from_bytes(&bytes[..bytes.len() - 1]).is_err());
}

#[test]
fn test_malformed_known_attribute() {
    let mut bytes = foo_class();
    // Shrink the field's ConstantValue payload to a single byte.
    let field_attribute = bytes
        .windows(6)
        .position(|w| w == [0x00, 0x08, 0x00, 0x00, 0x00, 0x02])
        .unwrap();
    bytes[field_attribute + 5] = 0x01;

    assert!(matches!(
        ClassFile::from_bytes(&bytes),
        Err(ClassFileError::MalformedAttribute {
            name: "ConstantValue",
            ..
        })
    ));
}

#[test]
fn test_deeply_nested_code_attributes() {
    let mut class_file = ClassFile::create("Nested", None).unwrap();
    let code_index = class_file.constant_pool.create_utf8("Code").unwrap();

    // Each level is a `Code` payload whose only nested attribute is the
    // previous level.
    let mut info = vec![0u8; 12];
    for _ in 0..3_000 {
        // Empty code and exception table, one nested attribute.
        let mut outer = vec![0u8; 12];
        outer[11] = 0x01;
        outer.extend_from_slice(&code_index.to_be_bytes());
        outer.extend_from_slice(&(info.len() as u32).to_be_bytes());
        outer.extend_from_slice(&info);
        info = outer;
    }
    class_file.attributes.push(Attribute {
        attribute_name_index: code_index,
        info: AttributeInfo::Unknown(info),
    });
    let bytes = class_file.to_bytes().unwrap();

    assert!(matches!(
        ClassFile::from_bytes(&bytes),
        Err(ClassFileError::MalformedAttribute { name: "Code", .. })
    ));
}

#[test]
fn test_parse_modes() {
    let bytes = foo_class();

    let constants = ClassFile::parse_with_mode(&bytes[..], ParseMode::Constants).unwrap();
    assert_eq!(13, constants.constant_pool.len());
    assert_eq!(0, constants.this_class);

    let interfaces = ClassFile::parse_with_mode(&bytes[..], ParseMode::Interfaces).unwrap();
    assert_eq!("Foo", interfaces.class_name().unwrap());
    assert!(interfaces.fields.is_empty());

    let fields = ClassFile::parse_with_mode(&bytes[..], ParseMode::Fields).unwrap();
    assert_eq!(1, fields.fields.len());
    assert!(fields.methods.is_empty());

    let methods = ClassFile::parse_with_mode(&bytes[..], ParseMode::Methods).unwrap();
    assert_eq!(1, methods.methods.len());
    assert!(methods.attributes.is_empty());
}

#[test]
fn test_create_defaults() {
    let class_file = ClassFile::create("HelloWorld", None).unwrap();

    assert_eq!((50, 0), class_file.version);
    assert_eq!(Some("J2SE 6.0"), class_file.version_name());
    assert_eq!(
        AccessFlags::PUBLIC | AccessFlags::SUPER,
        class_file.access_flags
    );
    assert_eq!(0x0021, class_file.access_flags.bits());
    assert_eq!("HelloWorld", class_file.class_name().unwrap());
    assert_eq!(
        Some("java/lang/Object"),
        class_file.super_class().unwrap().as_deref()
    );
    assert!(class_file.interfaces.is_empty());
    assert!(class_file.fields.is_empty());
    assert!(class_file.methods.is_empty());
    assert!(class_file.attributes.is_empty());
}

#[test]
fn test_create_with_super_class() {
    let class_file = ClassFile::create("my/Thread", Some("java/lang/Thread")).unwrap();

    assert_eq!(
        Some("java/lang/Thread"),
        class_file.super_class().unwrap().as_deref()
    );
}

#[test]
fn test_unknown_access_flags_round_trip() {
    let mut class_file = ClassFile::create("Flags", None).unwrap();
    class_file.access_flags = AccessFlags::from_bits_retain(0x0021 | 0x0100);
    let bytes = class_file.to_bytes().unwrap();

    assert_eq!(
        0x0121,
        ClassFile::from_bytes(&bytes).unwrap().access_flags.bits()
    );
}
